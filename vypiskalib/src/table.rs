//! Сырая таблица выписки: строки ячеек с адресацией по имени колонки.
//!
//! Таблица вложена в файл с переменным преамбулой и хвостом, поэтому
//! заголовок ищется по содержимому, а не по позиции.

use regex::Regex;

use crate::error::{ImportError, Result};

/// Последняя строка, содержащая весь ожидаемый набор меток (порядок и
/// лишние колонки не важны). Ранние совпадения — эхо метаданных.
pub fn locate_header(lines: &[Vec<String>], expected: &[String]) -> Result<usize> {
    let mut found = None;
    for (n, line) in lines.iter().enumerate() {
        if !expected.is_empty()
            && expected
                .iter()
                .all(|label| line.iter().any(|cell| cell == label))
        {
            found = Some(n);
        }
    }
    found.ok_or_else(|| ImportError::HeaderNotFound {
        expected: expected.to_vec(),
    })
}

/// Последняя строка, чья первая ячейка содержит метку начала таблицы.
pub fn locate_sentinel(lines: &[Vec<String>], label: &str) -> Result<usize> {
    let mut found = None;
    for (n, line) in lines.iter().enumerate() {
        if line.first().is_some_and(|cell| cell.contains(label)) {
            found = Some(n);
        }
    }
    found.ok_or_else(|| ImportError::SentinelNotFound(label.to_string()))
}

/// Обрезает хвост на первой полностью пустой строке после заголовка.
pub fn trim_footer(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let end = rows
        .iter()
        .position(|row| row.iter().all(|cell| cell.is_empty()))
        .unwrap_or(rows.len());
    rows.into_iter().take(end).collect()
}

/// Представление одной строки для вычисляемых колонок.
pub struct Row<'a> {
    header: &'a [String],
    cells: &'a [String],
}

impl Row<'_> {
    /// Значение ячейки по имени колонки; "" для отсутствующих.
    pub fn get(&self, name: &str) -> &str {
        self.header
            .iter()
            .position(|h| h == name)
            .and_then(|i| self.cells.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Table { header, rows }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|cells| Row {
            header: &self.header,
            cells,
        })
    }

    /// Добавляет колонку со значением, вычисленным из остальных ячеек строки.
    pub fn add_column<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Row<'_>) -> String,
    {
        let mut rows = Vec::with_capacity(self.rows.len());
        for cells in &self.rows {
            let value = f(&Row {
                header: &self.header,
                cells,
            });
            let mut cells = cells.clone();
            cells.push(value);
            rows.push(cells);
        }
        self.header.push(name.to_string());
        self.rows = rows;
        self
    }

    /// Перезаписывает существующую колонку значением, вычисленным из
    /// строки; без такой колонки таблица не меняется.
    pub fn set_column<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Row<'_>) -> String,
    {
        let Some(idx) = self.column(name) else {
            return self;
        };
        for cells in &mut self.rows {
            let value = f(&Row {
                header: &self.header,
                cells: &*cells,
            });
            if let Some(cell) = cells.get_mut(idx) {
                *cell = value;
            }
        }
        self
    }

    /// Переименование колонок по карте источник → каноническое имя.
    pub fn rename(mut self, map: &std::collections::HashMap<String, String>) -> Self {
        for name in &mut self.header {
            if let Some(canonical) = map.get(name) {
                *name = canonical.clone();
            }
        }
        self
    }

    /// Остаточные имена колонок приводятся к единому виду: пробелы,
    /// дефисы и косые — в подчёркивания.
    pub fn normalize_names(mut self) -> Result<Self> {
        let re = Regex::new(r"[-/ ]")?;
        for name in &mut self.header {
            *name = re.replace_all(name, "_").into_owned();
        }
        Ok(self)
    }

    /// Убирает строки-комментарии: первая ячейка начинается с маркера.
    pub fn drop_comment_rows(mut self, marker: &str) -> Self {
        self.rows
            .retain(|row| !row.first().is_some_and(|cell| cell.starts_with(marker)));
        self
    }

    /// Отбрасывает фиксированное число строк данных с начала.
    pub fn skip_rows(mut self, n: usize) -> Self {
        let n = n.min(self.rows.len());
        self.rows.drain(..n);
        self
    }
}
