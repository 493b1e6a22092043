//! Documentation file classification and sanitized content.

use std::path::{Component, Path, PathBuf};

use crate::GemError;

/// Returned by [`crate::GemSpec::readme_content`] when a gem ships no
/// markdown.
pub const NO_README: &str = "No README";

/// Placeholder for a markdown file that is not part of the gem.
#[must_use]
pub fn not_found_placeholder(file: &str) -> String {
    format!(r#"File "{file}" not found"#)
}

/// Kinds of file a manifest's file list is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.rb` files under `lib/` or `app/`.
    Source,
    /// Any `.md` file.
    Markdown,
    /// Markdown under a `doc/` or `docs/` directory.
    Docs,
    /// Markdown under a `guide/` or `guides/` directory.
    Guides,
    /// `.rbs` signature files.
    Rbs,
}

impl FileKind {
    #[must_use]
    pub fn matches(self, file: &str) -> bool {
        let markdown = file.ends_with(".md");
        match self {
            Self::Source => {
                file.ends_with(".rb") && (file.starts_with("lib/") || file.starts_with("app/"))
            }
            Self::Markdown => markdown,
            Self::Docs => markdown && (file.contains("doc/") || file.contains("docs/")),
            Self::Guides => markdown && (file.contains("guide/") || file.contains("guides/")),
            Self::Rbs => file.ends_with(".rbs"),
        }
    }
}

/// Files of `kind`, in manifest order.
#[must_use]
pub fn classify(files: &[String], kind: FileKind) -> Vec<String> {
    files.iter().filter(|f| kind.matches(f)).cloned().collect()
}

/// First markdown file whose path mentions "readme" in any case, else the
/// first markdown file.
#[must_use]
pub fn readme(markdown_files: &[String]) -> Option<&str> {
    markdown_files
        .iter()
        .find(|f| f.to_lowercase().contains("readme"))
        .or_else(|| markdown_files.first())
        .map(String::as_str)
}

/// `relative` resolved inside `root`, or `None` if it could leave it.
///
/// Manifest paths are untrusted: absolute paths, `..` and any other
/// non-plain component are refused outright, and the resolved file must
/// still lie under `root` once symlinks are followed.
///
/// # Errors
///
/// Returns [`GemError::Io`] if `root` or the file does not exist.
pub fn contained_path(root: &Path, relative: &str) -> Result<Option<PathBuf>, GemError> {
    let relative = Path::new(relative);
    let plain = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !plain || relative.as_os_str().is_empty() {
        return Ok(None);
    }

    let root = root.canonicalize()?;
    let resolved = root.join(relative).canonicalize()?;
    Ok(resolved.starts_with(&root).then_some(resolved))
}

/// Read `relative` under `root` and sanitize it. `None` if the path is
/// refused by [`contained_path`].
///
/// # Errors
///
/// Returns [`GemError::Io`] if the file cannot be read.
pub fn read_sanitized(
    root: &Path,
    relative: &str,
    sanitizer: &dyn Sanitizer,
) -> Result<Option<String>, GemError> {
    let Some(path) = contained_path(root, relative)? else {
        return Ok(None);
    };
    let raw = std::fs::read_to_string(path)?;
    Ok(Some(sanitizer.sanitize(&raw)))
}

/// Turns untrusted markup into plain text.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, content: &str) -> String;
}

/// Removes all markup and keeps text.
///
/// Tags, comments and declarations are dropped, as is everything inside
/// `<script>` and `<style>`. A `<` not followed by a letter, `/`, `!` or `?`
/// is text, so comparisons like `a < b` survive.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagStripper;

impl Sanitizer for TagStripper {
    fn sanitize(&self, content: &str) -> String {
        let mut out = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find('<') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];

            if tail.starts_with("<!--") {
                rest = tail.find("-->").map_or("", |end| &tail[end + 3..]);
                continue;
            }
            if !opens_tag(tail) {
                out.push('<');
                rest = &tail[1..];
                continue;
            }

            let Some(end) = tail.find('>') else {
                // Unterminated tag: drop the remainder.
                rest = "";
                break;
            };
            let name = tag_name(&tail[1..end]);
            rest = &tail[end + 1..];

            if name == "script" || name == "style" {
                rest = skip_past_closing(rest, &name);
            }
        }
        out.push_str(rest);
        out
    }
}

fn opens_tag(tail: &str) -> bool {
    tail[1..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
}

fn tag_name(inner: &str) -> String {
    inner
        .trim_start_matches('/')
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase()
}

fn skip_past_closing<'a>(rest: &'a str, name: &str) -> &'a str {
    let closing = format!("</{name}");
    let Some(at) = rest.to_ascii_lowercase().find(&closing) else {
        return "";
    };
    let after = &rest[at..];
    after.find('>').map_or("", |end| &after[end + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn files() -> Vec<String> {
        [
            "README.md",
            "CHANGELOG.md",
            "lib/beta.rb",
            "lib/beta/widget.rb",
            "app/models/beta/record.rb",
            "test/beta_test.rb",
            "docs/getting-started.md",
            "doc/api.md",
            "guides/upgrading.md",
            "guide/intro.txt",
            "sig/beta.rbs",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    #[rstest]
    #[case(FileKind::Source, &["lib/beta.rb", "lib/beta/widget.rb", "app/models/beta/record.rb"])]
    #[case(FileKind::Docs, &["docs/getting-started.md", "doc/api.md"])]
    #[case(FileKind::Guides, &["guides/upgrading.md"])]
    #[case(FileKind::Rbs, &["sig/beta.rbs"])]
    fn classifies_by_path_and_extension(#[case] kind: FileKind, #[case] expected: &[&str]) {
        assert_eq!(classify(&files(), kind), expected);
    }

    #[test]
    fn markdown_includes_every_md_file() {
        assert_eq!(classify(&files(), FileKind::Markdown).len(), 5);
    }

    #[test]
    fn readme_prefers_readme_named_file() {
        let markdown = vec!["CHANGELOG.md".to_string(), "docs/ReadMe.md".to_string()];
        assert_eq!(readme(&markdown), Some("docs/ReadMe.md"));

        let markdown = vec!["CHANGELOG.md".to_string(), "guide.md".to_string()];
        assert_eq!(readme(&markdown), Some("CHANGELOG.md"));

        assert_eq!(readme(&[]), None);
    }

    #[test]
    fn placeholder_names_the_file() {
        assert_eq!(not_found_placeholder("missing.md"), r#"File "missing.md" not found"#);
    }

    #[rstest]
    #[case("<h1>Beta</h1>\n<p>Widgets <b>fast</b>.</p>", "Beta\nWidgets fast.")]
    #[case("a <!-- hidden --> b", "a  b")]
    #[case("x<script>alert('no')</script>y", "xy")]
    #[case("x<STYLE type=\"text/css\">p{}</STYLE>y", "xy")]
    #[case("if a < b && Array<String>", "if a < b && Array")]
    #[case("1 < 2", "1 < 2")]
    #[case("plain text", "plain text")]
    #[case("broken <a href=", "broken ")]
    fn strips_markup(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(TagStripper.sanitize(input), expected);
    }

    #[test]
    fn read_sanitized_reads_relative_to_root() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("README.md"), "<em>Hi</em>").unwrap();
        assert_eq!(
            read_sanitized(temp.path(), "README.md", &TagStripper).unwrap(),
            Some("Hi".to_string())
        );
    }

    #[test]
    fn paths_leaving_the_root_are_refused() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("data");
        std::fs::create_dir_all(root.join("docs")).unwrap();
        std::fs::write(root.join("docs/usage.md"), "usage").unwrap();
        let outside = temp.path().join("secret.md");
        std::fs::write(&outside, "HOST SECRET").unwrap();

        let absolute = outside.to_str().unwrap();
        assert_eq!(contained_path(&root, absolute).unwrap(), None);
        assert_eq!(contained_path(&root, "../secret.md").unwrap(), None);
        assert_eq!(contained_path(&root, "docs/../../secret.md").unwrap(), None);
        assert_eq!(contained_path(&root, "./docs/usage.md").unwrap(), None);
        assert_eq!(contained_path(&root, "").unwrap(), None);
        assert_eq!(read_sanitized(&root, absolute, &TagStripper).unwrap(), None);

        assert!(contained_path(&root, "docs/usage.md").unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_out_of_the_root_are_refused() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("data");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(temp.path().join("secret.md"), "HOST SECRET").unwrap();
        std::os::unix::fs::symlink(temp.path().join("secret.md"), root.join("README.md")).unwrap();

        assert_eq!(read_sanitized(&root, "README.md", &TagStripper).unwrap(), None);
    }
}
