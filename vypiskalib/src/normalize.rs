//! Нормализация сырых строк: суммы, даты, перечисления, диакритика.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};

/// Десятичная конвенция источника. Задаётся явно, никогда не угадывается.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    #[default]
    Dot,
    Comma,
}

/// Точный разбор суммы: валютные знаки и прочий шум отбрасываются,
/// разделитель групп убирается согласно конвенции. Без плавающей точки.
pub fn parse_decimal(raw: &str, sep: DecimalSeparator) -> Result<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '-' | '.' | ','))
        .collect();

    let canonical = match sep {
        // точка — разделитель групп, запятая — десятичная
        DecimalSeparator::Comma => cleaned.replace('.', "").replace(',', "."),
        DecimalSeparator::Dot => cleaned.replace(',', ""),
    };

    if canonical.is_empty() {
        return Err(ImportError::MalformedAmount(raw.to_string()));
    }

    Decimal::from_str_exact(&canonical)
        .map_err(|_| ImportError::MalformedAmount(raw.to_string()))
}

/// Разбор даты по явному формату. Формат со временем даёт дату записи.
pub fn parse_date(raw: &str, format: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, format) {
        return Ok(d);
    }
    NaiveDateTime::parse_from_str(trimmed, format)
        .map(|dt| dt.date())
        .map_err(|_| ImportError::MalformedDate(format!("{trimmed} ({format})")))
}

/// Коды типов операций: известные переименовываются, незнакомые проходят
/// как есть (совместимость вперёд, фильтрация остаётся за skip-списком).
pub fn remap_enum(raw: &str, map: &HashMap<String, String>) -> String {
    map.get(raw).cloned().unwrap_or_else(|| raw.to_string())
}

/// Нижний регистр + свёртка акцентированных латинских гласных к ASCII.
/// Идемпотентна; нужна для локале-независимого сопоставления получателей.
pub fn strip_diacritics(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            other => other,
        })
        .collect()
}
