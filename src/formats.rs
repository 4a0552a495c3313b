//! Pandoc reader and writer catalogs
//!
//! The tags mirror what `pandoc --list-input-formats` and `--list-output-formats`
//! report. They are fixed here so that jobs, profiles and config files can be
//! validated without asking the binary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a format tag is not part of the catalog
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} format '{tag}'")]
pub struct UnknownFormat {
    pub kind: &'static str,
    pub tag: String,
}

macro_rules! format_catalog {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $variant:ident => $tag:literal, $ext:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $tag)]
                $variant,
            )+
        }

        impl $name {
            /// Every tag in the catalog, in alphabetical order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Tag passed to pandoc on the command line
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $tag,)+
                }
            }

            /// Canonical file extension (without the dot)
            pub fn extension(&self) -> &'static str {
                match self {
                    $($name::$variant => $ext,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownFormat;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let tag = s.trim().to_ascii_lowercase();
                match tag.as_str() {
                    $($tag => Ok($name::$variant),)+
                    _ => Err(UnknownFormat { kind: $kind, tag: s.to_string() }),
                }
            }
        }
    };
}

format_catalog! {
    /// Source dialects pandoc can read
    InputFormat, "input" {
        Biblatex => "biblatex", "bib";
        Bibtex => "bibtex", "bib";
        Commonmark => "commonmark", "md";
        CommonmarkX => "commonmark_x", "md";
        Creole => "creole", "creole";
        Csljson => "csljson", "json";
        Csv => "csv", "csv";
        Docbook => "docbook", "xml";
        Docx => "docx", "docx";
        Dokuwiki => "dokuwiki", "wiki";
        Endnotexml => "endnotexml", "xml";
        Epub => "epub", "epub";
        Fb2 => "fb2", "fb2";
        Gfm => "gfm", "md";
        Haddock => "haddock", "hs";
        Html => "html", "html";
        Ipynb => "ipynb", "ipynb";
        Jats => "jats", "xml";
        Jira => "jira", "jira";
        Json => "json", "json";
        Latex => "latex", "tex";
        Man => "man", "man";
        Markdown => "markdown", "md";
        MarkdownGithub => "markdown_github", "md";
        MarkdownMmd => "markdown_mmd", "md";
        MarkdownPhpextra => "markdown_phpextra", "md";
        MarkdownStrict => "markdown_strict", "md";
        Mediawiki => "mediawiki", "wiki";
        Muse => "muse", "muse";
        Native => "native", "native";
        Odt => "odt", "odt";
        Opml => "opml", "opml";
        Org => "org", "org";
        Ris => "ris", "ris";
        Rst => "rst", "rst";
        Rtf => "rtf", "rtf";
        T2t => "t2t", "t2t";
        Textile => "textile", "textile";
        Tikiwiki => "tikiwiki", "wiki";
        Tsv => "tsv", "tsv";
        Twiki => "twiki", "wiki";
        Typst => "typst", "typ";
        Vimwiki => "vimwiki", "wiki";
    }
}

format_catalog! {
    /// Target dialects pandoc can write
    OutputFormat, "output" {
        Asciidoc => "asciidoc", "adoc";
        Asciidoctor => "asciidoctor", "adoc";
        Beamer => "beamer", "tex";
        Biblatex => "biblatex", "bib";
        Bibtex => "bibtex", "bib";
        Chunkedhtml => "chunkedhtml", "zip";
        Commonmark => "commonmark", "md";
        CommonmarkX => "commonmark_x", "md";
        Context => "context", "tex";
        Csljson => "csljson", "json";
        Docbook => "docbook", "xml";
        Docbook4 => "docbook4", "xml";
        Docbook5 => "docbook5", "xml";
        Docx => "docx", "docx";
        Dokuwiki => "dokuwiki", "wiki";
        Dzslides => "dzslides", "html";
        Epub => "epub", "epub";
        Epub2 => "epub2", "epub";
        Epub3 => "epub3", "epub";
        Fb2 => "fb2", "fb2";
        Gfm => "gfm", "md";
        Haddock => "haddock", "hs";
        Html => "html", "html";
        Html4 => "html4", "html";
        Html5 => "html5", "html";
        Icml => "icml", "icml";
        Ipynb => "ipynb", "ipynb";
        Jats => "jats", "xml";
        JatsArchiving => "jats_archiving", "xml";
        JatsArticleauthoring => "jats_articleauthoring", "xml";
        JatsPublishing => "jats_publishing", "xml";
        Jira => "jira", "jira";
        Json => "json", "json";
        Latex => "latex", "tex";
        Man => "man", "man";
        Markdown => "markdown", "md";
        MarkdownGithub => "markdown_github", "md";
        MarkdownMmd => "markdown_mmd", "md";
        MarkdownPhpextra => "markdown_phpextra", "md";
        MarkdownStrict => "markdown_strict", "md";
        Markua => "markua", "markua";
        Mediawiki => "mediawiki", "wiki";
        Ms => "ms", "ms";
        Muse => "muse", "muse";
        Native => "native", "native";
        Odt => "odt", "odt";
        Opendocument => "opendocument", "xml";
        Opml => "opml", "opml";
        Org => "org", "org";
        Pdf => "pdf", "pdf";
        Plain => "plain", "txt";
        Pptx => "pptx", "pptx";
        Revealjs => "revealjs", "html";
        Rst => "rst", "rst";
        Rtf => "rtf", "rtf";
        S5 => "s5", "html";
        Slideous => "slideous", "html";
        Slidy => "slidy", "html";
        Tei => "tei", "xml";
        Texinfo => "texinfo", "texi";
        Textile => "textile", "textile";
        Typst => "typst", "typ";
        Xwiki => "xwiki", "wiki";
        Zimwiki => "zimwiki", "wiki";
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_catalog_round_trips_through_tags() {
        for format in OutputFormat::ALL {
            assert_eq!(format.as_str().parse::<OutputFormat>().unwrap(), *format);
        }
        assert_eq!(OutputFormat::ALL.len(), 64);
        assert_eq!(InputFormat::ALL.len(), 43);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("HTML".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert_eq!(" gfm ".parse::<InputFormat>().unwrap(), InputFormat::Gfm);
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = "wordperfect".parse::<OutputFormat>().unwrap_err();
        assert_eq!(err.kind, "output");
        assert!(err.to_string().contains("wordperfect"));
    }

    #[test]
    fn test_serde_uses_pandoc_tags() {
        let json = serde_json::to_string(&OutputFormat::JatsArticleauthoring).unwrap();
        assert_eq!(json, "\"jats_articleauthoring\"");
        let parsed: InputFormat = serde_json::from_str("\"commonmark_x\"").unwrap();
        assert_eq!(parsed, InputFormat::CommonmarkX);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(OutputFormat::Latex.extension(), "tex");
        assert_eq!(OutputFormat::Markdown.extension(), "md");
        assert_eq!(OutputFormat::Pdf.extension(), "pdf");
    }
}
