use crate::script::Script;

/// Code returned when no script signal is strong enough to decide.
pub const AUTO: &str = "auto";

/// High-frequency glyphs that only appear in Simplified Chinese.
const SIMPLIFIED_HINTS: &str = "这来时个们为国发对说会后现没动过种里实点开样关么还当两经气从业";
/// The Traditional counterparts of [`SIMPLIFIED_HINTS`], position for position.
const TRADITIONAL_HINTS: &str = "這來時個們為國發對說會後現沒動過種裡實點開樣關麼還當兩經氣從業";

/// Classify `text` by the Unicode scripts it contains.
///
/// Returns a language code (`ko`, `ja`, `zh-tw`, `zh-cn`, `zh`, `en`) or
/// [`AUTO`] when the text carries no usable signal.
///
/// # Examples
///
/// ```
/// use verso_lang::detect;
/// assert_eq!(detect("这是中文内容"), "zh-cn");
/// assert_eq!(detect("這是中文內容"), "zh-tw");
/// assert_eq!(detect("이것은 한국어 문장입니다"), "ko");
/// assert_eq!(detect("1234 !?"), "auto");
/// ```
pub fn detect(text: &str) -> &'static str {
    let hangul = Script::Hangul.count(text);
    let kana = Script::Hiragana.count(text) + Script::Katakana.count(text);
    let han = Script::Han.count(text);

    if hangul > 0 && hangul > kana + han {
        return "ko";
    }
    if kana > 0 {
        return "ja";
    }
    if han > 0 {
        let simplified = text.chars().filter(|&ch| SIMPLIFIED_HINTS.contains(ch)).count();
        let traditional = text.chars().filter(|&ch| TRADITIONAL_HINTS.contains(ch)).count();
        if Script::Bopomofo.count(text) > 0 || traditional > simplified {
            return "zh-tw";
        }
        if simplified > traditional {
            return "zh-cn";
        }
        return "zh";
    }
    if Script::Latin.count(text) > 0 {
        return "en";
    }
    AUTO
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("这是中文内容", "zh-cn")]
    #[case("這是中文內容", "zh-tw")]
    #[case("이것은 한국어 문장입니다", "ko")]
    #[case("これは日本語の文章です", "ja")]
    #[case("カタカナ", "ja")]
    #[case("中文", "zh")]
    #[case("ㄅㄆㄇ中文", "zh-tw")]
    #[case("Hello, world", "en")]
    #[case("", "auto")]
    #[case("12345 ... !!!", "auto")]
    #[case("Привет", "auto")]
    fn detects_language(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(detect(text), expected);
    }

    #[test]
    fn test_hangul_must_outnumber_kana_and_han() {
        // Two Hangul against two Han: not a majority.
        assert_eq!(detect("한국中文"), "zh");
        assert_eq!(detect("한국어中文"), "ko");
    }

    #[test]
    fn test_kana_wins_over_han() {
        assert_eq!(detect("日本語のテキスト"), "ja");
    }

    #[test]
    fn test_hint_sets_are_aligned() {
        assert_eq!(SIMPLIFIED_HINTS.chars().count(), TRADITIONAL_HINTS.chars().count());
    }
}
