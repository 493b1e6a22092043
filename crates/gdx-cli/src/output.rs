use serde::Serialize;

use crate::cli::OutputFormat;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

#[derive(Serialize)]
struct Document<'a> {
    name: &'a str,
    version: &'a str,
    path: &'a str,
    content: &'a str,
}

/// Render a text document: wrapped in JSON, or verbatim for `raw`.
pub fn render_document(
    name: &str,
    version: &str,
    path: &str,
    content: &str,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => render(
            &Document {
                name,
                version,
                path,
                content,
            },
            format,
        ),
        OutputFormat::Raw => Ok(content.to_string()),
    }
}

pub fn output_document(
    name: &str,
    version: &str,
    path: &str,
    content: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let rendered = render_document(name, version, path, content, format)?;
    println!("{rendered}");
    Ok(())
}
