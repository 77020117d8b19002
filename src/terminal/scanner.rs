// ABOUTME: Output scanning for raw terminal chunks
//
// Stateless text transforms applied to every inbound chunk:
// - Strip terminal control sequences down to printable text and newlines
// - Pick out the most recently mentioned source-file path
//
// This is a regex approximation of the escape grammar, not a terminal parser.
// Sequences split across chunks are only partially removed; the emulator
// handles those correctly for rendering.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// OSC: ESC ] ... terminated by BEL or ST (ESC \). An unterminated OSC is
    /// consumed up to the next ESC or BEL. DCS/PM/APC strings share the shape.
    static ref OSC_REGEX: Regex =
        Regex::new(r"\x1b[\]P^_][^\x07\x1b]*(?:\x07|\x1b\\)?").unwrap();

    /// CSI: ESC [ parameter bytes, intermediate bytes, final byte
    static ref CSI_REGEX: Regex =
        Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]").unwrap();

    /// Remaining two-character escapes (charset selection, keypad modes, save/restore)
    static ref ESC_REGEX: Regex = Regex::new(r"\x1b[ -/]*[0-~]").unwrap();

    /// Any C0 control except newline, DEL, and C1 controls
    static ref CONTROL_REGEX: Regex =
        Regex::new(r"[\x00-\x09\x0b-\x1f\x7f\u{80}-\u{9f}]").unwrap();

    /// Something that looks like a path to a source file
    static ref PATH_REGEX: Regex = Regex::new(
        r"(?:[A-Za-z]:[\\/]|~?/)?(?:[\w.\-]+[\\/])*[\w\-][\w.\-]*\.(?:rs|py|pyi|tsx|ts|jsx|js|mjs|cjs|go|java|kt|kts|scala|swift|c|cc|cpp|cxx|hpp|hh|h|cs|rb|php|lua|sh|bash|zsh|sql|vue|svelte|html|css|scss|json|toml|ya?ml|md|proto|ex|exs|erl|hs|ml|zig|dart)\b"
    )
    .unwrap();
}

/// Strip control sequences from a chunk of terminal output
///
/// Removes OSC strings, CSI sequences, other escape sequences, and stray
/// control characters. `\r\n` collapses to `\n`. The result contains only
/// printable text and newlines, so applying this twice is a no-op.
pub fn strip_control_sequences(chunk: &str) -> String {
    let text = OSC_REGEX.replace_all(chunk, "");
    let text = CSI_REGEX.replace_all(&text, "");
    let text = ESC_REGEX.replace_all(&text, "");
    let text = text.replace("\r\n", "\n");
    CONTROL_REGEX.replace_all(&text, "").into_owned()
}

/// Extract the last source-file path mentioned in already-clean text
///
/// When several paths appear in one chunk the last one wins, since the most
/// recent mention is the one the agent is most likely working on.
pub fn extract_path_candidate(clean: &str) -> Option<String> {
    PATH_REGEX
        .find_iter(clean)
        .last()
        .map(|m| m.as_str().to_string())
}

/// Convenience for the byte path: lossy-decode, strip, then extract
pub fn scan_chunk(bytes: &[u8]) -> Option<String> {
    let raw = String::from_utf8_lossy(bytes);
    extract_path_candidate(&strip_control_sequences(&raw))
}
