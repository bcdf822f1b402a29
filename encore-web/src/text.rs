use scraper::Html;

/// Elements whose text content is never shown to a reader.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Reduce an HTML document to its visible text on a single line.
///
/// Text nodes are joined with one space so words in adjacent elements do not
/// run together, then every whitespace run collapses to a single ASCII space.
/// Script, style and comment content is dropped. Escaped angle brackets in
/// the page text (`&lt;`, `&gt;`) come out as their fullwidth forms so the
/// result never parses as markup again.
///
/// ```
/// use encore_web::normalize_html;
///
/// let html = "<html><head><script>var x = 1;</script></head>\
///             <body><h1>Fall Gala</h1><p>Symphony\n\n   Hall</p></body></html>";
/// assert_eq!(normalize_html(html), "Fall Gala Symphony Hall");
/// ```
pub fn normalize_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut fragments: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            fragments.push(&**text);
        }
    }

    let text = neutralize_markup(&collapse_whitespace(&fragments.join(" ")));
    tracing::debug!(
        target: "normalize",
        html_bytes = html.len(),
        text_bytes = text.len(),
        "normalize.done"
    );
    text
}

/// Replace `<` and `>` with `＜` and `＞`.
fn neutralize_markup(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '<' => '＜',
            '>' => '＞',
            other => other,
        })
        .collect()
}

/// Collapse every run of whitespace (tabs, newlines, NBSP, ...) to one space
/// and trim both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Fall Gala | Symphony Hall</title>
    <style>body { font-family: serif; }</style>
    <script type="text/javascript">
      window.dataLayer = [];   function gtag(){ dataLayer.push(arguments); }
    </script>
  </head>
  <body>
    <!-- hero banner -->
    <nav><a href="/">Home</a><a href="/events">Events</a></nav>
    <main>
      <h1>Fall Gala</h1>
      <p>Event: Fall Gala on 2024-10-05 at 7pm,<br>Symphony&nbsp;Hall</p>
      <ul>
        <li><b>Yo-Yo Ma</b>, cello</li>
        <li>Beethoven:	Symphony No. 5</li>
      </ul>
      <noscript>Please enable JavaScript</noscript>
    </main>
    <script>console.log("tracking");</script>
  </body>
</html>"#;

    fn has_whitespace_run(s: &str) -> bool {
        s.chars()
            .zip(s.chars().skip(1))
            .any(|(a, b)| a.is_whitespace() && b.is_whitespace())
    }

    #[test]
    fn keeps_visible_text_in_document_order() {
        assert_eq!(
            normalize_html(PAGE),
            "Fall Gala | Symphony Hall Home Events Fall Gala \
             Event: Fall Gala on 2024-10-05 at 7pm, Symphony Hall \
             Yo-Yo Ma , cello Beethoven: Symphony No. 5"
        );
    }

    #[test]
    fn drops_scripts_styles_and_comments() {
        let out = normalize_html(PAGE);
        for leaked in ["dataLayer", "font-family", "tracking", "hero banner", "enable JavaScript"] {
            assert!(!out.contains(leaked), "leaked {leaked:?} into {out:?}");
        }
    }

    #[test]
    fn output_has_no_markup_and_no_whitespace_runs() {
        let inputs = [
            PAGE,
            "<div>\t\tone</div>\r\n<div>two  </div>",
            "<p>a<span>b</span>c</p>",
            "<table><tr><td>x</td><td>\u{a0}\u{a0}y</td></tr></table>",
            "",
            "   ",
        ];
        for html in inputs {
            let out = normalize_html(html);
            assert!(!out.contains('<') && !out.contains('>'), "{out:?}");
            assert!(!has_whitespace_run(&out), "{out:?}");
            assert_eq!(out, out.trim());
        }
    }

    #[test]
    fn adjacent_elements_do_not_concatenate_words() {
        assert_eq!(normalize_html("<p>Fall</p><p>Gala</p>"), "Fall Gala");
        assert_eq!(normalize_html("<td>Piano</td><td>Cello</td>"), "Piano Cello");
    }

    #[test]
    fn idempotent_on_plain_text() {
        let once = normalize_html(PAGE);
        assert_eq!(normalize_html(&once), once);

        let plain = "Event: Fall Gala on 2024-10-05 at 7pm, Symphony Hall...";
        assert_eq!(normalize_html(plain), plain);
    }

    #[test]
    fn escaped_markup_stays_text() {
        let once = normalize_html("<p>Tickets &lt;b&gt;on sale&lt;/b&gt; now</p>");
        assert_eq!(once, "Tickets ＜b＞on sale＜/b＞ now");
        assert_eq!(normalize_html(&once), once);

        let price = normalize_html("<td>Students &lt; 25 &amp; seniors &gt; 65</td>");
        assert_eq!(price, "Students ＜ 25 & seniors ＞ 65");
        assert_eq!(normalize_html(&price), price);
    }

    #[test]
    fn collapses_unicode_whitespace() {
        assert_eq!(collapse_whitespace(" a\u{a0}\u{a0}b\n\n\tc  "), "a b c");
        assert_eq!(collapse_whitespace("\n\t "), "");
    }
}
