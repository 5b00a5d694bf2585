//! Декларативная конфигурация источника. Все опции с явными значениями
//! по умолчанию; единственная точка инъекции поведения — чистая функция
//! преобразования таблицы.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::builder::collapse_empty_segments;
use crate::normalize::DecimalSeparator;
use crate::table::Table;

/// Стратегия датирования балансовой проверки (OFX).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceDateStrategy {
    /// Максимум из даты конца выписки, последней операции и балансовых
    /// дат минус страховой зазор. Даты провайдера часто оптимистичны.
    #[default]
    Smart,
    StatementEnd,
    LastTransaction,
    Today,
}

/// Сопоставление номера счёта из файла с настроенным.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountMatch {
    Exact,
    /// Выписки часто несут только хвост номера.
    #[default]
    Suffix,
}

fn default_fudge() -> i64 {
    2
}

fn default_true() -> bool {
    true
}

/// Конфигурация одного института; владеет ею координатор импорта.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub name: String,
    pub main_account: String,
    #[serde(default)]
    pub filing_account: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub filename_pattern: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub target_account: Option<String>,
    #[serde(default)]
    pub balance_date: BalanceDateStrategy,
    #[serde(default = "default_fudge")]
    pub balance_date_fudge: i64,
    #[serde(default = "default_true")]
    pub emit_filing_account_meta: bool,
    #[serde(default)]
    pub account_match: AccountMatch,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, main_account: impl Into<String>) -> Self {
        SourceConfig {
            name: name.into(),
            main_account: main_account.into(),
            filing_account: None,
            account_number: None,
            filename_pattern: None,
            currency: None,
            target_account: None,
            balance_date: BalanceDateStrategy::default(),
            balance_date_fudge: default_fudge(),
            emit_filing_account_meta: true,
            account_match: AccountMatch::default(),
        }
    }

    /// Счёт для классификации: явный filing_account либо основной счёт,
    /// в обоих случаях без пустых сегментов.
    pub fn filing_account(&self) -> String {
        collapse_empty_segments(self.filing_account.as_deref().unwrap_or(&self.main_account))
    }
}

/// Чистое преобразование сырой таблицы, один хук на источник.
pub type TableTransform = fn(Table) -> Table;

/// Декларация табличного источника: где таблица, как читать колонки.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Регулярное выражение по началу файла для опознания источника.
    pub header_identifier: String,
    /// Полный набор меток строки-заголовка таблицы.
    pub column_labels: Vec<String>,
    /// Метка начала таблицы в первой колонке вместо строки-заголовка.
    pub start_sentinel: Option<String>,
    pub date_format: String,
    pub decimal_separator: DecimalSeparator,
    pub delimiter: u8,
    pub skip_comments: Option<String>,
    pub skip_head_rows: usize,
    pub skip_tail_rows: usize,
    pub skip_data_rows: usize,
    /// Колонка источника → каноническое поле.
    pub header_map: HashMap<String, String>,
    /// Сырые (до переименования типов) коды операций, которые не попадают
    /// в выдачу: ожидающие авторизации и прочие дубли.
    pub skip_transaction_types: Vec<String>,
    pub transaction_type_map: HashMap<String, String>,
    /// Преобразование сырых строк до поиска таблицы.
    pub raw_transform: Option<fn(Vec<Vec<String>>) -> Vec<Vec<String>>>,
    /// Преобразование найденной таблицы до переименования колонок.
    pub transform: Option<TableTransform>,
    /// Отдавать баланс первой строки как балансовую проверку.
    pub emit_balance: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            header_identifier: String::new(),
            column_labels: Vec::new(),
            start_sentinel: None,
            date_format: "%Y-%m-%d".to_string(),
            decimal_separator: DecimalSeparator::Dot,
            delimiter: b',',
            skip_comments: None,
            skip_head_rows: 0,
            skip_tail_rows: 0,
            skip_data_rows: 0,
            header_map: HashMap::new(),
            skip_transaction_types: Vec::new(),
            transaction_type_map: HashMap::new(),
            raw_transform: None,
            transform: None,
            emit_balance: false,
        }
    }
}
