//! Unicode script ranges used for detection and OCR filtering.
//!
//! The ranges are intentionally coarse: they cover the blocks that carry
//! almost all running text for each script and nothing else.

use std::ops::RangeInclusive;

/// Writing systems the heuristics know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Hangul,
    Hiragana,
    Katakana,
    Han,
    Bopomofo,
    Latin,
    Cyrillic,
    Arabic,
    Hebrew,
    Devanagari,
    Thai,
}

const HANGUL: &[RangeInclusive<char>] = &['\u{ac00}'..='\u{d7a3}', '\u{1100}'..='\u{11ff}', '\u{3130}'..='\u{318f}'];
const HIRAGANA: &[RangeInclusive<char>] = &['\u{3040}'..='\u{309f}'];
const KATAKANA: &[RangeInclusive<char>] = &['\u{30a0}'..='\u{30ff}'];
const HAN: &[RangeInclusive<char>] = &['\u{3400}'..='\u{4dbf}', '\u{4e00}'..='\u{9fff}'];
const BOPOMOFO: &[RangeInclusive<char>] = &['\u{3100}'..='\u{312f}', '\u{31a0}'..='\u{31bf}'];
const LATIN: &[RangeInclusive<char>] = &['A'..='Z', 'a'..='z'];
const CYRILLIC: &[RangeInclusive<char>] = &['\u{0400}'..='\u{04ff}'];
const ARABIC: &[RangeInclusive<char>] = &['\u{0600}'..='\u{06ff}'];
const HEBREW: &[RangeInclusive<char>] = &['\u{0590}'..='\u{05ff}'];
const DEVANAGARI: &[RangeInclusive<char>] = &['\u{0900}'..='\u{097f}'];
const THAI: &[RangeInclusive<char>] = &['\u{0e00}'..='\u{0e7f}'];

impl Script {
    pub const ALL: [Script; 11] = [
        Self::Hangul,
        Self::Hiragana,
        Self::Katakana,
        Self::Han,
        Self::Bopomofo,
        Self::Latin,
        Self::Cyrillic,
        Self::Arabic,
        Self::Hebrew,
        Self::Devanagari,
        Self::Thai,
    ];

    fn ranges(self) -> &'static [RangeInclusive<char>] {
        match self {
            Self::Hangul => HANGUL,
            Self::Hiragana => HIRAGANA,
            Self::Katakana => KATAKANA,
            Self::Han => HAN,
            Self::Bopomofo => BOPOMOFO,
            Self::Latin => LATIN,
            Self::Cyrillic => CYRILLIC,
            Self::Arabic => ARABIC,
            Self::Hebrew => HEBREW,
            Self::Devanagari => DEVANAGARI,
            Self::Thai => THAI,
        }
    }

    /// Returns `true` if `ch` belongs to this script.
    pub fn contains(self, ch: char) -> bool {
        self.ranges().iter().any(|range| range.contains(&ch))
    }

    /// The script of a single character, if it is one we track.
    pub fn of(ch: char) -> Option<Script> {
        Self::ALL.into_iter().find(|script| script.contains(ch))
    }

    /// Number of characters in `text` belonging to this script.
    pub fn count(self, text: &str) -> usize {
        text.chars().filter(|&ch| self.contains(ch)).count()
    }

    /// Scripts written with ideographs or syllable blocks, where adjacent
    /// fragments are joined without a separator.
    pub fn is_cjk(self) -> bool {
        matches!(self, Self::Hangul | Self::Hiragana | Self::Katakana | Self::Han | Self::Bopomofo)
    }

    /// Scripts that do not separate words with spaces, and so wrap per character.
    pub fn is_unspaced(self) -> bool {
        matches!(self, Self::Hiragana | Self::Katakana | Self::Han | Self::Bopomofo | Self::Thai)
    }

    /// Scripts expected in text written in `lang`.
    ///
    /// Unknown or Latin-script languages fall back to Latin only.
    pub fn for_language(lang: &str) -> &'static [Script] {
        match lang.to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" => &[Self::Han],
            "zh-tw" => &[Self::Han, Self::Bopomofo],
            "ko" => &[Self::Hangul],
            "ja" => &[Self::Hiragana, Self::Katakana, Self::Han],
            "ru" | "uk" | "bg" => &[Self::Cyrillic],
            "ar" | "fa" | "ur" => &[Self::Arabic],
            "he" => &[Self::Hebrew],
            "hi" => &[Self::Devanagari],
            "th" => &[Self::Thai],
            _ => &[Self::Latin],
        }
    }
}

/// Returns `true` if `text` contains at least one character of a tracked script.
pub fn has_known_script(text: &str) -> bool {
    text.chars().any(|ch| Script::of(ch).is_some())
}

/// Returns `true` if `text` contains at least one character of a script used
/// by `lang`.
pub fn matches_language(text: &str, lang: &str) -> bool {
    let scripts = Script::for_language(lang);
    text.chars().any(|ch| scripts.iter().any(|script| script.contains(ch)))
}

/// A fragment is CJK-scripted when it has at least one letter and every
/// letter belongs to a CJK script. Digits and punctuation are ignored.
pub fn is_cjk_text(text: &str) -> bool {
    let mut letters = text.chars().filter(|ch| ch.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|ch| Script::of(ch).is_some_and(Script::is_cjk))
}

/// Returns `true` if `text` should be wrapped per character rather than per word.
pub fn is_unspaced_text(text: &str) -> bool {
    !text.trim().contains(char::is_whitespace)
        && text.chars().any(|ch| Script::of(ch).is_some_and(Script::is_unspaced))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case('한', Some(Script::Hangul))]
    #[case('ㄱ', Some(Script::Hangul))]
    #[case('ひ', Some(Script::Hiragana))]
    #[case('カ', Some(Script::Katakana))]
    #[case('中', Some(Script::Han))]
    #[case('ㄅ', Some(Script::Bopomofo))]
    #[case('q', Some(Script::Latin))]
    #[case('Ж', Some(Script::Cyrillic))]
    #[case('ب', Some(Script::Arabic))]
    #[case('ש', Some(Script::Hebrew))]
    #[case('क', Some(Script::Devanagari))]
    #[case('ก', Some(Script::Thai))]
    #[case('7', None)]
    #[case('!', None)]
    fn script_of_char(#[case] ch: char, #[case] expected: Option<Script>) {
        assert_eq!(Script::of(ch), expected);
    }

    #[rstest]
    #[case("中文", "zh-tw", true)]
    #[case("ㄅㄆ", "zh-tw", true)]
    #[case("ㄅㄆ", "zh-cn", false)]
    #[case("カタカナ", "ja", true)]
    #[case("Hello", "ja", false)]
    #[case("Привет", "uk", true)]
    #[case("Hello", "fr", true)]
    #[case("中文", "xx", false)]
    fn language_filter(#[case] text: &str, #[case] lang: &str, #[case] expected: bool) {
        assert_eq!(matches_language(text, lang), expected);
    }

    #[rstest]
    #[case("中文", true)]
    #[case("日本語です。", true)]
    #[case("한국어", true)]
    #[case("中文 ABC", false)]
    #[case("Hello", false)]
    #[case("123", false)]
    fn cjk_fragments(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_cjk_text(text), expected);
    }

    #[rstest]
    #[case("这是中文内容", true)]
    #[case("これは日本語", true)]
    #[case("한국어 문장", false)]
    #[case("hello world", false)]
    fn test_unspaced_text(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_unspaced_text(text), expected);
    }
}
