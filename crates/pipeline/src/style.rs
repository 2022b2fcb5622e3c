//! Typography for books translated into a CJK language.

use verso_config::StyleConfig;

/// Where the stylesheet is stored inside the book.
pub const STYLESHEET_HREF: &str = "style/cjk.css";

/// Default `font-family` stack for a CJK target language. Anything that is
/// not Japanese or Chinese gets the Korean stack.
pub fn font_stack(lang: &str) -> &'static str {
    match lang {
        "ja" => r#""Noto Sans JP", "Noto Sans CJK JP", "Hiragino Sans", "Yu Gothic", sans-serif"#,
        "zh" | "zh-cn" => r#""Noto Sans SC", "Noto Sans CJK SC", "PingFang SC", "Microsoft YaHei", sans-serif"#,
        "zh-tw" => r#""Noto Sans TC", "Noto Sans CJK TC", "PingFang TC", "Microsoft JhengHei", sans-serif"#,
        _ => r#""Noto Sans KR", "Noto Sans CJK KR", "Apple SD Gothic Neo", "Malgun Gothic", sans-serif"#,
    }
}

/// Build the stylesheet for `lang` from the user's style settings.
pub fn cjk_stylesheet(lang: &str, style: &StyleConfig) -> String {
    let family = style.font_family.as_deref().unwrap_or_else(|| font_stack(lang));
    let mut css = format!(
        "body {{\n  font-family: {family};\n  font-size: {};\n  line-height: {};\n}}\np {{\n  margin-bottom: {};\n}}\n",
        style.font_size, style.line_height, style.paragraph_spacing,
    );
    if let Some(heading) = &style.heading_font_family {
        css.push_str(&format!("h1, h2, h3, h4, h5, h6 {{\n  font-family: {heading};\n}}\n"));
    }
    css
}
