use harvester_engine::{decode_html, harvest_page, PageParser, ScraperParser};
use pretty_assertions::assert_eq;

#[test]
fn parser_collects_anchors_and_visible_text() {
    let html = r#"<html><head><title>Shop</title><style>p { color: red }</style></head>
        <body>
          <script>var hidden = "ghost@script.org";</script>
          <table><tr><td>sales@shop.org</td><td>Open daily</td></tr></table>
          <a href=" /contact ">Contact</a>
          <a href="">Empty</a>
          <map><area href="/region"></map>
        </body></html>"#;
    let page = ScraperParser::new().parse(html);

    assert_eq!(page.anchors, vec!["/contact".to_string(), "/region".to_string()]);
    assert!(page.text.contains("sales@shop.org Open daily"));
    assert!(!page.text.contains("ghost@script.org"));
    assert!(!page.text.contains("color"));
}

#[test]
fn parser_caps_anchor_count() {
    let html: String = (0..10)
        .map(|i| format!(r#"<a href="/p{i}">{i}</a>"#))
        .collect();
    let page = ScraperParser::with_max_anchors(3).parse(&html);
    assert_eq!(page.anchors.len(), 3);
}

#[test]
fn harvest_resolves_against_page_directory() {
    let page = ScraperParser::new().parse(
        r#"<a href="/about">About</a>
           <a href="team.html">Team</a>
           <a href="/about">Again</a>
           <a href="javascript:void(0)">Nothing</a>
           <a href="mailto:Owner@Firm.org">Mail</a>
           <a href="brochure.PDF">Brochure</a>"#,
    );
    let harvest = harvest_page("https://example.com/dir/", &page);

    assert_eq!(
        harvest.links,
        vec![
            "https://example.com/dir/about".to_string(),
            "https://example.com/dir/team.html".to_string(),
        ]
    );
    assert_eq!(
        harvest.emails.into_iter().collect::<Vec<_>>(),
        vec!["Owner@Firm.org".to_string()]
    );
}

#[test]
fn search_engine_pages_do_not_link_back_to_search_engines() {
    let page = ScraperParser::new().parse(
        r#"<a href="https://www.bing.com/search?q=more">More</a>
           <a href="https://duckduckgo.com/l/?uddg=https%3A%2F%2Fshop.org%2F">Shop</a>"#,
    );
    let harvest = harvest_page("https://www.bing.com/search?q=shops", &page);
    assert_eq!(harvest.links, vec!["https://shop.org/".to_string()]);
}

#[test]
fn decoded_latin1_page_feeds_the_parser() {
    let bytes = b"<p>Caf\xe9 contact: hola@cafe.es</p>";
    let decoded = decode_html(bytes, Some("text/html; charset=ISO-8859-1"));
    let page = ScraperParser::new().parse(&decoded.html);
    let harvest = harvest_page("https://cafe.es/", &page);

    assert!(page.text.contains("Caf\u{e9}"));
    assert!(harvest.emails.contains("hola@cafe.es"));
}
