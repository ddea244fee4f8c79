use nsgen_derive::nsgen_error;
use std::borrow::Cow;

#[nsgen_error]
pub enum ArchiveError {
    #[error("Archive I/O error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Download not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn open(path: &str) -> Result<std::fs::File, ArchiveError> {
    std::fs::File::open(path).context("Opening scratch archive")
}

fn main() {
    let err = open("/definitely/not/here.zip").unwrap_err();
    assert!(err.to_string().contains("Opening scratch archive"));

    let internal: ArchiveError = "boom".into();
    assert!(matches!(internal, ArchiveError::Internal { .. }));

    let tagged: Result<(), ArchiveError> = Err(ArchiveError::NotFound {
        message: "abc".into(),
        context: None,
    });
    let tagged = tagged.context("token lookup").unwrap_err();
    assert_eq!(tagged.to_string(), "Download not found (token lookup): abc");
}
