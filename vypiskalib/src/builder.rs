//! Канонизация: типизированные строки любого читателя превращаются в
//! проводки двойной записи и балансовые проверки.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::SourceConfig;
use crate::model::{Amount, BalanceAssertion, Entry, Flag, Posting, Transaction, TxnRow};
use crate::traits::BalanceStatement;

/// Валюта, когда её не объявили ни строка, ни файл, ни конфигурация.
const CURRENCY_NOT_CONFIGURED: &str = "CURRENCY_NOT_CONFIGURED";

/// Доступ к тексту строки; переопределяется источником.
pub type RowText = fn(&TxnRow) -> String;

fn payee_of(row: &TxnRow) -> String {
    row.payee.clone()
}

/// Убирает пустые сегменты счёта после подстановок: `Assets:Foo::Bar`
/// становится `Assets:Foo:Bar`.
pub fn collapse_empty_segments(account: &str) -> String {
    account
        .split(':')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(":")
}

pub struct EntryBuilder {
    get_payee: RowText,
    get_narration: RowText,
}

impl Default for EntryBuilder {
    fn default() -> Self {
        // описание по умолчанию повторяет получателя
        EntryBuilder {
            get_payee: payee_of,
            get_narration: payee_of,
        }
    }
}

impl EntryBuilder {
    pub fn with_accessors(get_payee: RowText, get_narration: RowText) -> Self {
        EntryBuilder {
            get_payee,
            get_narration,
        }
    }

    fn meta(&self, config: &SourceConfig) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();
        if config.emit_filing_account_meta {
            meta.insert("filing_account".to_string(), config.filing_account());
        }
        meta
    }

    /// Одна операция: проводка на основной счёт с суммой строки и, если
    /// целевой счёт известен, встречная проводка без суммы — её выведет
    /// бухгалтерия. Иначе вторую ногу допишет внешний классификатор.
    pub fn build_transaction(
        &self,
        row: &TxnRow,
        config: &SourceConfig,
        file_currency: Option<&str>,
    ) -> Transaction {
        let currency = row
            .currency
            .clone()
            .or_else(|| file_currency.map(str::to_string))
            .or_else(|| config.currency.clone())
            .unwrap_or_else(|| CURRENCY_NOT_CONFIGURED.to_string());

        let price = match (&row.foreign_amount, &row.foreign_currency) {
            (Some(number), Some(code)) => Some(Amount::new(*number, code.clone())),
            _ => None,
        };

        let mut postings = vec![Posting {
            account: collapse_empty_segments(&config.main_account),
            units: Some(Amount::new(row.amount, currency)),
            cost: None,
            price,
        }];
        if let Some(target) = &config.target_account {
            postings.push(Posting {
                account: collapse_empty_segments(target),
                units: None,
                cost: None,
                price: None,
            });
        }

        Transaction {
            date: row.date,
            flag: Flag::Cleared,
            payee: Some((self.get_payee)(row)),
            narration: (self.get_narration)(row),
            tags: BTreeSet::new(),
            links: BTreeSet::new(),
            meta: self.meta(config),
            postings,
        }
    }

    pub fn build_balance(&self, bal: &BalanceStatement, config: &SourceConfig) -> BalanceAssertion {
        BalanceAssertion {
            date: bal.date,
            account: collapse_empty_segments(&config.main_account),
            amount: Amount::new(bal.amount, bal.currency.clone()),
            meta: self.meta(config),
        }
    }

    /// Все операции файла, затем балансовые проверки.
    pub fn build_entries(
        &self,
        rows: &[TxnRow],
        balances: &[BalanceStatement],
        config: &SourceConfig,
        file_currency: Option<&str>,
    ) -> Vec<Entry> {
        let mut entries = Vec::with_capacity(rows.len() + balances.len());
        for row in rows {
            entries.push(Entry::Transaction(self.build_transaction(
                row,
                config,
                file_currency,
            )));
        }
        for bal in balances {
            entries.push(Entry::Balance(self.build_balance(bal, config)));
        }
        // общая хронология; при равных датах порядок вставки сохраняется
        entries.sort_by_key(Entry::date);
        entries
    }
}
