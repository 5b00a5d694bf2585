use chrono::NaiveDate;
use rust_decimal::Decimal;

use vypiskalib::config::{AccountMatch, BalanceDateStrategy, SourceConfig};
use vypiskalib::formats::ofx::OfxReader;
use vypiskalib::error::ImportError;
use vypiskalib::traits::StatementReader;

const STATEMENT: &str = "\
OFXHEADER:100
DATA:OFXSGML
VERSION:102

<OFX>
<BANKMSGSRSV1>
<STMTTRNRS>
<STMTRS>
<CURDEF>EUR
<BANKACCTFROM>
<BANKID>2100
<ACCTID>ES7921000813610123456789
</BANKACCTFROM>
<BANKTRANLIST>
<DTSTART>20240301
<DTEND>20240310
<STMTTRN>
<TRNTYPE>DEBIT
<DTPOSTED>20240301120000.000[+1:CET]
<TRNAMT>-3.50
<NAME>Coffee Shop
<MEMO>card payment
</STMTTRN>
<STMTTRN>
<TRNTYPE>CREDIT
<DTPOSTED>20240305
<TRNAMT>100.00
<NAME>Salary
</STMTTRN>
</BANKTRANLIST>
<LEDGERBAL>
<BALAMT>96.50
<DTASOF>20240312
</LEDGERBAL>
<AVAILBAL>
<BALAMT>90.00
<DTASOF>20240311
</AVAILBAL>
</STMTRS>
</STMTTRNRS>
</BANKMSGSRSV1>
</OFX>
";

fn config() -> SourceConfig {
    let mut config = SourceConfig::new("Caixabank", "Assets:ES:Caixabank");
    config.account_number = Some("0123456789".to_string());
    config
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn statement_rows_are_typed() {
    let mut reader = OfxReader::new();
    reader.read_str(STATEMENT, &config()).expect("read");

    let rows = reader.transactions();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, date(2024, 3, 1));
    assert_eq!(rows[0].payee, "Coffee Shop");
    assert_eq!(rows[0].memo.as_deref(), Some("card payment"));
    assert_eq!(rows[0].amount, Decimal::from_str_exact("-3.50").unwrap());
    assert_eq!(rows[0].txn_type.as_deref(), Some("DEBIT"));
    assert_eq!(rows[1].payee, "Salary");
    assert_eq!(reader.currency(), Some("EUR"));
}

#[test]
fn account_is_selected_by_suffix_by_default() {
    let mut reader = OfxReader::new();
    reader.read_str(STATEMENT, &config()).expect("suffix match");

    let mut exact = config();
    exact.account_match = AccountMatch::Exact;
    let err = reader.read_str(STATEMENT, &exact).unwrap_err();
    assert!(matches!(err, ImportError::AccountNotMatched(_)));
    // после провала подбора строк нет
    assert!(reader.transactions().is_empty());

    exact.account_number = Some("ES7921000813610123456789".to_string());
    reader.read_str(STATEMENT, &exact).expect("exact match");
}

#[test]
fn unconfigured_account_number_is_an_error() {
    let mut reader = OfxReader::new();
    let config = SourceConfig::new("Caixabank", "Assets:ES:Caixabank");
    let err = reader.read_str(STATEMENT, &config).unwrap_err();
    assert!(matches!(err, ImportError::AccountNotMatched(_)));
}

#[test]
fn empty_leaf_tags_are_ignored() {
    // пустой <NAME></NAME> не должен затенять MEMO
    let content = STATEMENT.replace(
        "<NAME>Coffee Shop\n<MEMO>card payment",
        "<NAME></NAME>\n<MEMO>card payment",
    );
    let mut reader = OfxReader::new();
    reader.read_str(&content, &config()).expect("read");
    assert_eq!(reader.transactions()[0].payee, "card payment");
}

#[test]
fn balance_date_strategies() {
    let mut reader = OfxReader::new();
    reader.read_str(STATEMENT, &config()).expect("read");

    // smart: максимум из конца выписки (03-10), последней операции (03-05)
    // и балансовых дат минус зазор 2 (03-09, 03-10), плюс день
    let mut cfg = config();
    cfg.balance_date = BalanceDateStrategy::Smart;
    assert_eq!(reader.balance_assertion_date(&cfg), Some(date(2024, 3, 11)));

    cfg.balance_date = BalanceDateStrategy::StatementEnd;
    assert_eq!(reader.balance_assertion_date(&cfg), Some(date(2024, 3, 11)));

    cfg.balance_date = BalanceDateStrategy::LastTransaction;
    assert_eq!(reader.balance_assertion_date(&cfg), Some(date(2024, 3, 6)));

    cfg.balance_date = BalanceDateStrategy::Today;
    let today = chrono::Utc::now().date_naive();
    assert_eq!(
        reader.balance_assertion_date(&cfg),
        Some(today + chrono::Duration::days(1))
    );
}

#[test]
fn smart_date_widens_with_fudge() {
    let mut reader = OfxReader::new();
    reader.read_str(STATEMENT, &config()).expect("read");

    // нулевой зазор: балансовая дата 03-12 побеждает конец выписки
    let mut cfg = config();
    cfg.balance_date_fudge = 0;
    assert_eq!(reader.balance_assertion_date(&cfg), Some(date(2024, 3, 13)));
}

#[test]
fn ledger_balance_becomes_statement() {
    let mut reader = OfxReader::new();
    reader.read_str(STATEMENT, &config()).expect("read");

    let balances = reader.balance_statement(&config());
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].amount, Decimal::from_str_exact("96.50").unwrap());
    assert_eq!(balances[0].currency, "EUR");
    assert_eq!(balances[0].date, date(2024, 3, 11));
}

#[test]
fn identify_downgrades_foreign_files() {
    let path = std::env::temp_dir().join(format!("vypiska-{}-foreign.ofx", std::process::id()));
    std::fs::write(&path, "<OFX>\n<SIGNONMSGSRSV1>\n</SIGNONMSGSRSV1>\n</OFX>\n")
        .expect("write fixture");

    let mut reader = OfxReader::new();
    assert!(!reader.identify(&path, &config()).expect("identify"));

    let txt = path.with_extension("txt");
    std::fs::write(&txt, STATEMENT).expect("write fixture");
    assert!(!reader.identify(&txt, &config()).expect("identify"));
}

#[test]
fn identify_downgrades_malformed_statements() {
    let content = STATEMENT.replace("<DTPOSTED>20240305", "<DTPOSTED>2024");
    let path = std::env::temp_dir().join(format!("vypiska-{}-malformed.ofx", std::process::id()));
    std::fs::write(&path, &content).expect("write fixture");

    let mut reader = OfxReader::new();
    // кривой файл при пробе — «не наш», полное чтение остаётся ошибкой
    assert!(!reader.identify(&path, &config()).expect("identify"));
    assert!(matches!(
        reader.read_str(&content, &config()).unwrap_err(),
        ImportError::MalformedDate(_)
    ));
}

#[test]
fn file_without_statements_is_an_error() {
    let mut reader = OfxReader::new();
    let err = reader
        .read_str("<OFX>\n<SIGNONMSGSRSV1>\n</SIGNONMSGSRSV1>\n</OFX>\n", &config())
        .unwrap_err();
    assert!(matches!(err, ImportError::Ofx(_)));
}
