pub mod config;
pub mod error;
pub mod ignore_rules;
pub mod languages;
pub mod scanner;
pub mod serializer;

pub use config::{Config, GeneralConfig, OutputConfig, SkeletonConfig};
pub use error::{AppError, Result};
pub use ignore_rules::{IgnoreResolver, PatternScope, Verdict};
pub use languages::{AnalysisResult, JavaAnalyzer, LanguageAnalyzer, OMITTED_BODY};
pub use scanner::{FileRecord, ScanOptions, ScanReport, Scanner};
pub use serializer::{SerializeOptions, escape_cdata, serialize};
