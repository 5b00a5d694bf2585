//! Координатор импорта: конфигурация источника, читатель и канонизатор
//! собраны композицией; наружу — только опознание и извлечение.

use std::path::Path;

use regex::Regex;

use crate::builder::EntryBuilder;
use crate::config::SourceConfig;
use crate::error::{ImportError, Result};
use crate::model::Entry;
use crate::traits::{Reader, StatementReader};

pub struct Importer {
    config: SourceConfig,
    reader: Reader,
    builder: EntryBuilder,
}

impl Importer {
    pub fn new(config: SourceConfig, reader: Reader) -> Self {
        Importer {
            config,
            reader,
            builder: EntryBuilder::default(),
        }
    }

    pub fn with_builder(config: SourceConfig, reader: Reader, builder: EntryBuilder) -> Self {
        Importer {
            config,
            reader,
            builder,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Счёт, под которым файл раскладывается во внешнем архиве документов.
    pub fn account(&self) -> String {
        self.config.filing_account()
    }

    /// Дешёвое опознание: имя файла, расширение, структурная проба.
    /// Несовпадение счёта в файле — «не наш файл», а не авария.
    pub fn identify(&mut self, path: &Path) -> Result<bool> {
        if let Some(pattern) = &self.config.filename_pattern {
            let re = Regex::new(pattern)?;
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if !re.is_match(name) {
                return Ok(false);
            }
        }
        match self.reader.identify(path, &self.config) {
            Ok(recognized) => Ok(recognized),
            Err(ImportError::AccountNotMatched(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Полное извлечение: операции файла, затем балансовые проверки.
    /// Любая структурная или типовая ошибка фатальна для файла — частичных
    /// результатов не бывает.
    pub fn extract(&mut self, path: &Path) -> Result<Vec<Entry>> {
        self.reader.read(path, &self.config)?;
        let file_currency = self.reader.currency().map(str::to_string);
        let balances = self.reader.balance_statement(&self.config);
        Ok(self.builder.build_entries(
            self.reader.transactions(),
            &balances,
            &self.config,
            file_currency.as_deref(),
        ))
    }
}
