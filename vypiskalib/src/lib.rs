//! vypiskalib — импорт банковских выписок (CSV, OFX/QFX) в канонические
//! записи двойной записи для текстовой бухгалтерии.

pub mod builder;
pub mod config;
pub mod error;
pub mod importer;
pub mod model;
pub mod normalize;
pub mod sources;
pub mod table;
pub mod traits;

pub mod formats {
    pub mod csv;
    pub mod ofx;
}
