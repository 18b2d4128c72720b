pub mod init;
pub mod inspect;
pub mod score;
pub mod train;
pub mod translate;

use std::fmt::Display;
use std::io::Read;
use std::path::Path;
use std::process;

use nmt::corpus::{parse_corpus, read_corpus, strip_markers, Side};

/// Print `error: <context>: <err>` and exit with status 1.
pub fn fail(context: &str, err: impl Display) -> ! {
    eprintln!("error: {}: {}", context, err);
    process::exit(1);
}

/// Read a source-side corpus file, or stdin when `path` is `None`.
pub fn read_source(path: Option<&Path>) -> Vec<Vec<String>> {
    match path {
        Some(path) => {
            read_corpus(path, Side::Source).unwrap_or_else(|e| fail("cannot read source", e))
        }
        None => {
            let mut text = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut text) {
                fail("cannot read stdin", e);
            }
            parse_corpus(&text, Side::Source)
        }
    }
}

/// Read a target-side corpus file as plain sentences, markers removed.
pub fn read_target(path: &Path) -> Vec<Vec<String>> {
    read_corpus(path, Side::Target)
        .unwrap_or_else(|e| fail("cannot read target", e))
        .iter()
        .map(|s| strip_markers(s))
        .collect()
}

/// Exit unless both corpora hold the same number of sentences.
pub fn check_parallel(src: &[Vec<String>], tgt: &[Vec<String>]) {
    if src.len() != tgt.len() {
        fail(
            "corpus mismatch",
            format!("{} source vs {} target sentences", src.len(), tgt.len()),
        );
    }
}
