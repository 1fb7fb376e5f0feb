use std::fmt;

pub mod java;

pub use java::{JavaAnalyzer, OMITTED_BODY};

/// Outcome of analyzing one source file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisResult {
    /// Rewritten source. Empty when `errors` is not.
    pub skeleton: String,
    /// Diagnostics in discovery order.
    pub errors: Vec<String>,
}

impl AnalysisResult {
    pub fn ok(skeleton: String) -> Self {
        Self {
            skeleton,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            skeleton: String::new(),
            errors,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A language-specific skeletonizer.
///
/// The scanner keeps an ordered list of analyzers and hands each file to the
/// first one whose [`supports`](LanguageAnalyzer::supports) returns true.
pub trait LanguageAnalyzer: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, file_name: &str) -> bool;

    fn analyze(&self, source: &str) -> AnalysisResult;
}

/// The analyzers registered when skeletonization is enabled.
pub fn default_analyzers() -> Vec<Box<dyn LanguageAnalyzer>> {
    vec![Box::new(JavaAnalyzer)]
}

/// First analyzer that claims `file_name`, if any.
pub fn find_analyzer<'a>(
    analyzers: &'a [Box<dyn LanguageAnalyzer>],
    file_name: &str,
) -> Option<&'a dyn LanguageAnalyzer> {
    analyzers
        .iter()
        .find(|a| a.supports(file_name))
        .map(|a| a.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Upper;

    impl LanguageAnalyzer for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }
        fn supports(&self, file_name: &str) -> bool {
            file_name.ends_with(".java") || file_name.ends_with(".up")
        }
        fn analyze(&self, source: &str) -> AnalysisResult {
            AnalysisResult::ok(source.to_uppercase())
        }
    }

    #[test]
    fn first_supporting_analyzer_wins() {
        let analyzers: Vec<Box<dyn LanguageAnalyzer>> =
            vec![Box::new(Upper), Box::new(JavaAnalyzer)];
        assert_eq!(find_analyzer(&analyzers, "App.java").unwrap().name(), "upper");
        assert_eq!(find_analyzer(&analyzers, "a.up").unwrap().name(), "upper");
        assert!(find_analyzer(&analyzers, "a.txt").is_none());

        let java_first = default_analyzers();
        assert_eq!(find_analyzer(&java_first, "App.java").unwrap().name(), "java");
    }

    #[test]
    fn failed_result_has_no_skeleton() {
        let result = AnalysisResult::failed(vec!["boom".to_string()]);
        assert!(result.has_errors());
        assert!(result.skeleton.is_empty());
        assert!(!AnalysisResult::ok("x".into()).has_errors());
    }
}
