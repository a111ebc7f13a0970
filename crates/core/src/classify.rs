//! Content classifiers.
//!
//! Pure predicates that decide which normalizer, if any, handles a file or
//! attachment. The two link classifiers are independent: an attachment can
//! qualify as both a slack link and an unfurling link, or as neither.

use crate::payload::AttachmentPayload;

/// Slack filetypes indexed through the plain-text normalizer.
pub const PLAIN_TEXT_FILETYPES: &[&str] = &[
    "text",
    "applescript",
    "c",
    "csharp",
    "cpp",
    "css",
    "csv",
    "clojure",
    "coffeescript",
    "d",
    "dart",
    "diff",
    "dockerfile",
    "docs",
    "erlang",
    "fortran",
    "go",
    "gpres",
    "groovy",
    "gzip",
    "html",
    "handlebars",
    "haskell",
    "haxe",
    "java",
    "javascript",
    "json",
    "kotlin",
    "latex",
    "lisp",
    "lua",
    "markdown",
    "matlab",
    "mumps",
    "objc",
    "ocaml",
    "pascal",
    "perl",
    "php",
    "pig",
    "powershell",
    "puppet",
    "python",
    "r",
    "ruby",
    "rust",
    "sql",
    "sass",
    "scala",
    "scheme",
    "shell",
    "smalltalk",
    "swift",
    "tsv",
    "vb",
    "vbscript",
    "velocity",
    "xml",
];

pub fn is_plain_text_file(filetype: &str) -> bool {
    PLAIN_TEXT_FILETYPES.contains(&filetype)
}

pub fn is_pdf_file(filetype: &str) -> bool {
    filetype == "pdf"
}

/// A shared Slack message: needs an id, url, author, and body text.
pub fn is_slack_link(attachment: &AttachmentPayload) -> bool {
    attachment.id.map_or(false, |id| id > 0)
        && has_text(&attachment.original_url)
        && has_text(&attachment.author_id)
        && has_text(&attachment.text)
}

/// An external link preview: needs an id, url, title, and body text.
pub fn is_unfurling_link(attachment: &AttachmentPayload) -> bool {
    attachment.id.map_or(false, |id| id > 0)
        && has_text(&attachment.original_url)
        && has_text(&attachment.title)
        && has_text(&attachment.text)
}

fn has_text(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|value| !value.is_empty())
}
