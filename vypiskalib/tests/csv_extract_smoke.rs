use std::collections::HashMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use vypiskalib::config::{CsvOptions, SourceConfig};
use vypiskalib::formats::csv::CsvReader;
use vypiskalib::importer::Importer;
use vypiskalib::model::Entry;
use vypiskalib::normalize::DecimalSeparator;
use vypiskalib::traits::{Reader, StatementReader};

fn write_fixture(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("vypiska-{}-{name}", std::process::id()));
    std::fs::write(&path, content).expect("write fixture");
    path
}

fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn test_options() -> CsvOptions {
    CsvOptions {
        column_labels: vec![
            "Date".to_string(),
            "Description".to_string(),
            "Amount".to_string(),
            "Currency".to_string(),
        ],
        date_format: "%d/%m/%Y".to_string(),
        decimal_separator: DecimalSeparator::Comma,
        header_map: map(&[("Date", "date"), ("Description", "payee"), ("Amount", "amount"), ("Currency", "currency")]),
        ..CsvOptions::default()
    }
}

#[test]
fn end_to_end_single_transaction() {
    let content = "\
Account export for client 42\n\
\n\
Date,Description,Amount,Currency\n\
01/03/2024,Coffee Shop,\"-3,50\",EUR\n\
\n\
Total,,\"-3,50\",\n\
Generated by the bank\n";
    let path = write_fixture("Test-march.csv", content);

    let mut config = SourceConfig::new("Test", "Assets:EU:Test:Checking");
    config.filename_pattern = Some("^vypiska-".to_string());
    let mut importer = Importer::new(config, Reader::Csv(CsvReader::new(test_options())));

    assert!(importer.identify(&path).expect("identify"));

    let entries = importer.extract(&path).expect("extract");
    assert_eq!(entries.len(), 1);
    let Entry::Transaction(txn) = &entries[0] else {
        panic!("expected a transaction");
    };
    assert_eq!(txn.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    assert_eq!(txn.payee.as_deref(), Some("Coffee Shop"));
    assert_eq!(txn.postings.len(), 1);
    let units = txn.postings[0].units.as_ref().expect("main posting amount");
    assert_eq!(units.number, Decimal::from_str_exact("-3.50").unwrap());
    assert_eq!(units.currency, "EUR");
    assert_eq!(txn.postings[0].account, "Assets:EU:Test:Checking");
    assert_eq!(
        txn.meta.get("filing_account").map(String::as_str),
        Some("Assets:EU:Test:Checking")
    );
}

#[test]
fn filename_pattern_mismatch_is_not_recognized() {
    let path = write_fixture(
        "other.csv",
        "Date,Description,Amount,Currency\n01/03/2024,Shop,\"-1,00\",EUR\n",
    );
    let mut config = SourceConfig::new("Test", "Assets:Test");
    config.filename_pattern = Some("^Statement-".to_string());
    let mut importer = Importer::new(config, Reader::Csv(CsvReader::new(test_options())));
    assert!(!importer.identify(&path).expect("identify"));
}

#[test]
fn missing_header_is_fatal_for_the_file() {
    let path = write_fixture(
        "Test-badlayout.csv",
        "Datum,Beschreibung,Betrag\n01/03/2024,Shop,\"-1,00\"\n",
    );
    let mut importer = Importer::new(
        SourceConfig::new("Test", "Assets:Test"),
        Reader::Csv(CsvReader::new(test_options())),
    );
    // проба вежливо отвечает «не наш», извлечение — ошибкой
    assert!(!importer.identify(&path).expect("identify"));
    assert!(importer.extract(&path).is_err());
}

#[test]
fn sentinel_marks_table_without_known_labels() {
    // метка начала таблицы вместо известного набора колонок:
    // заголовком служит строка сразу за меткой
    let content = "\
Preamble junk\n\
Account Statement:,,\n\
Date,Description,Amount,Currency\n\
01/03/2024,Coffee Shop,\"-3,50\",EUR\n";
    let mut options = test_options();
    options.column_labels = Vec::new();
    options.start_sentinel = Some("Account Statement:".to_string());

    let mut reader = CsvReader::new(options.clone());
    reader.read_str(content).expect("read");
    let rows = reader.transactions();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].payee, "Coffee Shop");

    // опознание и извлечение согласованы
    let path = write_fixture("Test-sentinel.csv", content);
    let mut importer = Importer::new(
        SourceConfig::new("Test", "Assets:Test"),
        Reader::Csv(CsvReader::new(options)),
    );
    assert!(importer.identify(&path).expect("identify"));
    assert_eq!(importer.extract(&path).expect("extract").len(), 1);
}

#[test]
fn skip_list_matches_raw_type_not_remapped() {
    // skip-список сверяется с сырым кодом до переименования типов:
    // код из skip-списка отбрасывается даже при наличии его в карте типов,
    // незнакомый код проходит нетронутым.
    let mut options = test_options();
    options.column_labels.push("Type".to_string());
    options.header_map.insert("Type".to_string(), "type".to_string());
    options.skip_transaction_types = vec!["General Authorization - Pending".to_string()];
    options.transaction_type_map = map(&[
        ("General Authorization - Pending", "payment"),
        ("Website Payment", "payment"),
    ]);

    let content = "\
Date,Description,Amount,Currency,Type\n\
01/03/2024,Pending hold,\"-5,00\",EUR,General Authorization - Pending\n\
02/03/2024,Shop,\"-3,50\",EUR,Website Payment\n\
03/03/2024,New code,\"-1,00\",EUR,Mystery Code\n";
    let mut reader = CsvReader::new(options);
    reader.read_str(content).expect("read");

    let rows = reader.transactions();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].txn_type.as_deref(), Some("payment"));
    assert_eq!(rows[1].txn_type.as_deref(), Some("Mystery Code"));
}

#[test]
fn balance_assertion_dated_day_after_last_transaction() {
    let mut options = test_options();
    options.column_labels.push("Balance".to_string());
    options.header_map.insert("Balance".to_string(), "balance".to_string());
    options.emit_balance = true;

    let content = "\
Date,Description,Amount,Currency,Balance\n\
08/03/2024,Shop,\"-1,00\",EUR,\"121,00\"\n\
10/03/2024,Shop,\"-1,00\",EUR,\"120,00\"\n";
    let mut reader = CsvReader::new(options);
    reader.read_str(content).expect("read");

    let config = SourceConfig::new("Test", "Assets:Test");
    assert_eq!(
        reader.balance_assertion_date(&config),
        NaiveDate::from_ymd_opt(2024, 3, 11)
    );

    let balances = reader.balance_statement(&config);
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].date, NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    // баланс берётся из первой строки таблицы
    assert_eq!(balances[0].amount, Decimal::from_str_exact("121.00").unwrap());
    assert_eq!(balances[0].currency, "EUR");
}

#[test]
fn comment_rows_and_fixed_offsets_are_dropped() {
    let mut options = test_options();
    options.skip_comments = Some("# ".to_string());
    options.skip_data_rows = 1;

    let content = "\
Date,Description,Amount,Currency\n\
# exported 2024-03-12\n\
01/03/2024,Opening row,\"0,00\",EUR\n\
02/03/2024,Shop,\"-2,00\",EUR\n";
    let mut reader = CsvReader::new(options);
    reader.read_str(content).expect("read");

    let rows = reader.transactions();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].payee, "Shop");
}

#[test]
fn malformed_amount_aborts_the_file() {
    let mut reader = CsvReader::new(test_options());
    let err = reader
        .read_str("Date,Description,Amount,Currency\n01/03/2024,Shop,oops,EUR\n")
        .unwrap_err();
    assert!(matches!(err, vypiskalib::error::ImportError::MalformedAmount(_)));
    assert!(reader.transactions().is_empty());
}
