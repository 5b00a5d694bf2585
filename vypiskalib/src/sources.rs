//! Адаптеры институтов: декларативные настройки таблицы плюс чистые
//! преобразования строк. Управляющей логики здесь нет.

use std::collections::HashMap;

use crate::config::{CsvOptions, SourceConfig};
use crate::formats::csv::CsvReader;
use crate::formats::ofx::OfxReader;
use crate::importer::Importer;
use crate::normalize::{parse_decimal, DecimalSeparator};
use crate::table::Table;
use crate::traits::Reader;

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn string_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn named(mut config: SourceConfig, default_name: &str) -> SourceConfig {
    if config.name.is_empty() {
        config.name = default_name.to_string();
    }
    config
}

/// Revolut: экспорт с брутто-суммой и комиссией отдельной колонкой.
pub fn revolut(config: SourceConfig) -> Importer {
    let options = CsvOptions {
        column_labels: labels(&[
            "Type",
            "Product",
            "Started Date",
            "Completed Date",
            "Description",
            "Amount",
            "Fee",
            "Currency",
            "State",
            "Balance",
        ]),
        date_format: "%Y-%m-%d %H:%M:%S".to_string(),
        decimal_separator: DecimalSeparator::Dot,
        header_map: string_map(&[
            ("Started Date", "date"),
            ("Currency", "currency"),
            ("Type", "type"),
            ("Description", "payee"),
            ("Amount", "amount"),
            ("Balance", "balance"),
        ]),
        transaction_type_map: string_map(&[
            ("TOPUP", "payment"),
            ("CARD_PAYMENT", "payment"),
            ("TRANSFER", "payment"),
        ]),
        transform: Some(revolut_transform),
        emit_balance: true,
        ..CsvOptions::default()
    };
    Importer::new(
        named(config, "Revolut"),
        Reader::Csv(CsvReader::new(options)),
    )
}

fn revolut_transform(table: Table) -> Table {
    table
        // чистая сумма: брутто минус комиссия
        .set_column("Amount", |row| {
            let gross = parse_decimal(row.get("Amount"), DecimalSeparator::Dot);
            let fee = parse_decimal(row.get("Fee"), DecimalSeparator::Dot);
            match (gross, fee) {
                (Ok(gross), Ok(fee)) => (gross - fee).to_string(),
                // об ошибке сообщит типизация колонок
                _ => row.get("Amount").to_string(),
            }
        })
        .add_column("memo", |_| String::new())
}

/// N26: суммы всегда в евро, оригинальная валюта — отдельной парой колонок.
pub fn n26(config: SourceConfig) -> Importer {
    let options = CsvOptions {
        column_labels: labels(&[
            "Booking Date",
            "Value Date",
            "Partner Name",
            "Partner Iban",
            "Type",
            "Payment Reference",
            "Account Name",
            "Amount (EUR)",
            "Original Amount",
            "Original Currency",
            "Exchange Rate",
        ]),
        date_format: "%Y-%m-%d".to_string(),
        decimal_separator: DecimalSeparator::Dot,
        header_map: string_map(&[
            ("Booking Date", "date"),
            ("Type", "type"),
            ("Payment Reference", "payee"),
            ("Amount (EUR)", "amount"),
            ("Original Amount", "foreign_amount"),
            ("Original Currency", "foreign_currency"),
        ]),
        transaction_type_map: string_map(&[
            ("Credit Transfer", "payment"),
            ("Instant Savings", "payment"),
            ("Debig Transfer", "payment"),
        ]),
        transform: Some(n26_transform),
        ..CsvOptions::default()
    };
    Importer::new(named(config, "N26"), Reader::Csv(CsvReader::new(options)))
}

fn n26_transform(table: Table) -> Table {
    table
        .add_column("currency", |_| "EUR".to_string())
        .add_column("memo", |_| String::new())
}

/// Paypal: запятая как десятичный разделитель, получатель собирается из
/// описания и имени контрагента, ожидающие авторизации отбрасываются.
pub fn paypal(config: SourceConfig) -> Importer {
    let options = CsvOptions {
        column_labels: labels(&[
            "Date",
            "Time",
            "Time Zone",
            "Description",
            "Currency",
            "Gross ",
            "Fee ",
            "Net",
            "Balance",
            "Transaction ID",
            "From Email Address",
            "Name",
            "Bank Name",
            "Bank Account",
            "Shipping and Handling Amount",
            "Sales Tax",
            "Invoice ID",
            "Reference Txn ID",
        ]),
        date_format: "%d/%m/%Y".to_string(),
        decimal_separator: DecimalSeparator::Comma,
        skip_comments: Some("# ".to_string()),
        header_map: string_map(&[
            ("Date", "date"),
            ("From Email Address", "checknum"),
            ("Currency", "currency"),
            ("Description", "type"),
        ]),
        skip_transaction_types: vec![
            "General Authorization - Pending".to_string(),
            "General Authorization - Completed".to_string(),
        ],
        transaction_type_map: string_map(&[
            ("Website Payment", "payment"),
            ("PreApproved Payment Bill User Payment", "payment"),
            ("Express Checkout Payment", "payment"),
        ]),
        transform: Some(paypal_transform),
        emit_balance: true,
        ..CsvOptions::default()
    };
    Importer::new(
        named(config, "Paypal"),
        Reader::Csv(CsvReader::new(options)),
    )
}

fn paypal_transform(table: Table) -> Table {
    table
        .add_column("amount", |row| row.get("Net").to_string())
        .add_column("balance", |row| row.get("Balance").to_string())
        .add_column("payee", |row| {
            format!("{}: {}", row.get("Description"), row.get("Name"))
        })
        .add_column("memo", |_| String::new())
}

/// Caixabank: OFX-выписка, счёт выбирается по хвосту номера.
pub fn caixabank(config: SourceConfig) -> Importer {
    Importer::new(named(config, "Caixabank"), Reader::Ofx(OfxReader::new()))
}
