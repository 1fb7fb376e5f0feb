//! XML rendering of a scanned file set.
//!
//! The flat record list is folded into a name tree and written with sorted
//! children, so the output depends only on the set of files and never on the
//! order in which they were discovered. All text lives in CDATA blocks.

use crate::config::{Config, DEFAULT_INSTRUCTIONS_FILE};
use crate::scanner::FileRecord;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use log;
use quick_xml::escape::escape;
use std::borrow::Cow;

pub const CDATA_OPEN: &str = "<![CDATA[";
pub const CDATA_TERMINATOR: &str = "]]>";
/// Replacement for a terminator found inside content: closes the current
/// block between `]]` and `>` and reopens a new one.
pub const CDATA_TERMINATOR_ESCAPED: &str = "]]]]><![CDATA[>";

const INDENT: &str = "  ";

const USAGE_NOTES: &str = "The <project_tree> section shows the directory hierarchy.\n\
<d n=\"name\"> is a directory, <f n=\"name\"> is a file containing CDATA content.\n\
Method, constructor and initializer bodies of supported languages may be replaced \
with \"{ /* implementation omitted */ }\" to save space.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Root-level file whose content is embedded as custom instructions.
    /// Compared case-insensitively.
    pub instructions_file: String,
    pub generated_at: Option<DateTime<Utc>>,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            instructions_file: DEFAULT_INSTRUCTIONS_FILE.to_string(),
            generated_at: None,
        }
    }
}

impl SerializeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            instructions_file: config.output.instructions_file.clone(),
            generated_at: config.output.include_timestamp.then(Utc::now),
        }
    }
}

/// Splits every `]]>` so the content cannot close its CDATA block early.
pub fn escape_cdata(content: &str) -> Cow<'_, str> {
    if content.contains(CDATA_TERMINATOR) {
        Cow::Owned(content.replace(CDATA_TERMINATOR, CDATA_TERMINATOR_ESCAPED))
    } else {
        Cow::Borrowed(content)
    }
}

fn push_cdata(out: &mut String, content: &str) {
    out.push_str(CDATA_OPEN);
    out.push_str(&escape_cdata(content));
    out.push_str(CDATA_TERMINATOR);
}

#[derive(Debug, Default)]
struct TreeNode<'a> {
    name: String,
    file: Option<&'a FileRecord>,
    children: IndexMap<String, TreeNode<'a>>,
}

impl<'a> TreeNode<'a> {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn insert(&mut self, record: &'a FileRecord) {
        let normalized = record.path.replace('\\', "/");
        let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
        let Some((leaf, dirs)) = parts.split_last() else {
            log::warn!("Skipping record with empty path");
            return;
        };

        let mut current = self;
        for part in dirs {
            current = current
                .children
                .entry(part.to_string())
                .or_insert_with(|| TreeNode::new(part));
        }
        let node = current
            .children
            .entry(leaf.to_string())
            .or_insert_with(|| TreeNode::new(leaf));
        if node.file.is_some() {
            log::warn!("Duplicate path {}; keeping the last record", record.path);
        }
        node.file = Some(record);
    }

    fn sorted_children(&self) -> Vec<&TreeNode<'a>> {
        let mut children: Vec<&TreeNode<'a>> = self.children.values().collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }
}

fn build_tree(files: &[FileRecord]) -> TreeNode<'_> {
    log::debug!("Building tree structure from {} files...", files.len());
    let mut root = TreeNode::new("");
    for record in files {
        root.insert(record);
    }
    root
}

/// Renders `files` as a single XML document.
pub fn serialize(files: &[FileRecord], options: &SerializeOptions) -> String {
    let content_len: usize = files.iter().map(|f| f.content.len()).sum();
    let mut out = String::with_capacity(content_len + files.len() * 64 + 1024);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<codebase>\n");

    write_summary(&mut out, files, options);

    let tree = build_tree(files);
    out.push_str("<project_tree>\n");
    write_children(&mut out, &tree, "");
    out.push_str("</project_tree>\n");

    out.push_str("</codebase>\n");
    log::debug!("Serialized {} files into {} bytes", files.len(), out.len());
    out
}

fn write_summary(out: &mut String, files: &[FileRecord], options: &SerializeOptions) {
    out.push_str("<summary>\n");

    out.push_str("<agent_instructions>");
    push_cdata(out, &format!("\n{}\n", USAGE_NOTES));
    out.push_str("</agent_instructions>\n");

    out.push_str(&format!("<file_count>{}</file_count>\n", files.len()));

    if let Some(ts) = options.generated_at {
        out.push_str(&format!(
            "<generated_at>{}</generated_at>\n",
            ts.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }

    // Names differing only in case can all match; the smallest path wins.
    let instructions = files
        .iter()
        .filter(|f| {
            f.path
                .replace('\\', "/")
                .eq_ignore_ascii_case(&options.instructions_file)
        })
        .min_by(|a, b| a.path.cmp(&b.path));
    if let Some(file) = instructions {
        log::debug!("Embedding custom instructions from {}", file.path);
        out.push_str("<agent_custom_instructions>\n");
        push_cdata(out, &format!("\n{}\n", file.content));
        out.push_str("\n</agent_custom_instructions>\n");
    }

    out.push_str("</summary>\n\n");
}

fn write_children(out: &mut String, node: &TreeNode<'_>, indent: &str) {
    for child in node.sorted_children() {
        let name = escape(child.name.as_str());
        if let Some(file) = child.file {
            out.push_str(&format!("{}<f n=\"{}\">", indent, name));
            push_cdata(out, &file.content);
            out.push_str("</f>\n");
        }
        // A name that is both a file and a directory is emitted twice, file first.
        if !child.children.is_empty() {
            out.push_str(&format!("{}<d n=\"{}\">\n", indent, name));
            write_children(out, child, &format!("{}{}", indent, INDENT));
            out.push_str(&format!("{}</d>\n", indent));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn records(pairs: &[(&str, &str)]) -> Vec<FileRecord> {
        pairs.iter().map(|(p, c)| FileRecord::new(*p, *c)).collect()
    }

    #[test]
    fn renders_nested_tree_with_sorted_children() {
        let files = records(&[
            ("src/Main.java", "public class Main {}"),
            ("README.md", "# Hello"),
            ("src/a/B.java", "class B {}"),
        ]);
        let xml = serialize(&files, &SerializeOptions::default());

        let tree_start = xml.find("<project_tree>").unwrap();
        assert_eq!(
            &xml[tree_start..],
            "<project_tree>\n\
             <f n=\"README.md\"><![CDATA[# Hello]]></f>\n\
             <d n=\"src\">\n\
             \x20 <f n=\"Main.java\"><![CDATA[public class Main {}]]></f>\n\
             \x20 <d n=\"a\">\n\
             \x20   <f n=\"B.java\"><![CDATA[class B {}]]></f>\n\
             \x20 </d>\n\
             </d>\n\
             </project_tree>\n\
             </codebase>\n"
        );
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<codebase>\n<summary>\n"));
        assert!(xml.contains("<file_count>3</file_count>"));
    }

    #[test]
    fn custom_instructions_are_embedded_case_insensitively() {
        let files = records(&[("agents.MD", "Be terse."), ("x.txt", "x")]);
        let xml = serialize(&files, &SerializeOptions::default());
        assert!(xml.contains(
            "<agent_custom_instructions>\n<![CDATA[\nBe terse.\n]]>\n</agent_custom_instructions>"
        ));
        assert!(xml.contains("<f n=\"agents.MD\"><![CDATA[Be terse.]]></f>"));
    }

    #[test]
    fn case_variant_instructions_files_do_not_depend_on_order() {
        let files = records(&[("AGENTS.md", "upper"), ("agents.md", "lower")]);
        let mut reversed = files.clone();
        reversed.reverse();

        let options = SerializeOptions::default();
        let xml = serialize(&files, &options);
        assert_eq!(xml, serialize(&reversed, &options));
        assert!(xml.contains("<![CDATA[\nupper\n]]>"));
    }

    #[test]
    fn nested_instructions_file_is_not_promoted() {
        let files = records(&[("docs/AGENTS.md", "nope")]);
        let xml = serialize(&files, &SerializeOptions::default());
        assert!(!xml.contains("<agent_custom_instructions>"));
    }

    #[test]
    fn terminator_is_split_everywhere() {
        assert_eq!(escape_cdata("plain"), Cow::Borrowed("plain"));
        assert_eq!(escape_cdata("a]]>b]]>"), "a]]]]><![CDATA[>b]]]]><![CDATA[>");

        let files = records(&[("AGENTS.md", "x]]>y"), ("f.txt", "]]>")]);
        let xml = serialize(&files, &SerializeOptions::default());
        assert!(xml.contains("<![CDATA[\nx]]]]><![CDATA[>y\n]]>"));
        assert!(xml.contains("<f n=\"f.txt\"><![CDATA[]]]]><![CDATA[>]]></f>"));
    }

    #[test]
    fn names_are_attribute_escaped() {
        let files = records(&[("a&b/\"q\".txt", "")]);
        let xml = serialize(&files, &SerializeOptions::default());
        assert!(xml.contains("<d n=\"a&amp;b\">"));
        assert!(xml.contains("<f n=\"&quot;q&quot;.txt\">"));
    }

    #[test]
    fn file_and_directory_with_same_name_are_both_kept() {
        let files = records(&[("x/inner.txt", "in"), ("x", "file")]);
        let xml = serialize(&files, &SerializeOptions::default());
        assert!(xml.contains(
            "<f n=\"x\"><![CDATA[file]]></f>\n<d n=\"x\">\n  <f n=\"inner.txt\"><![CDATA[in]]></f>\n</d>\n"
        ));
    }

    #[test]
    fn backslashes_and_empty_segments_are_normalized() {
        let files = records(&[("dir\\sub//f.txt", "c")]);
        let xml = serialize(&files, &SerializeOptions::default());
        assert!(xml.contains("<d n=\"dir\">\n  <d n=\"sub\">\n    <f n=\"f.txt\">"));
    }

    #[test]
    fn duplicate_paths_keep_the_last_record() {
        let files = records(&[("a.txt", "first"), ("a.txt", "second")]);
        let xml = serialize(&files, &SerializeOptions::default());
        assert!(xml.contains("<f n=\"a.txt\"><![CDATA[second]]></f>"));
        assert!(!xml.contains("first"));
    }

    #[test]
    fn timestamp_is_only_emitted_when_requested() {
        let files = records(&[("a.txt", "a")]);
        assert!(!serialize(&files, &SerializeOptions::default()).contains("<generated_at>"));

        let ts = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let options = SerializeOptions {
            generated_at: Some(ts),
            ..Default::default()
        };
        assert!(serialize(&files, &options).contains("<generated_at>2024-05-01T12:00:00Z</generated_at>"));
    }
}
