//! Raw (description, link) extraction from menu markup

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::config::LevelSelectors;
use crate::error::{CrawlError, CrawlResult};
use crate::types::RawItem;

pub fn compile(selector: &str) -> CrawlResult<Selector> {
    Selector::parse(selector).map_err(|e| CrawlError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Text of an element with every text node trimmed and joined without separator
pub fn element_text(element: &ElementRef) -> String {
    element.text().map(str::trim).collect()
}

/// Result of scanning one level: the usable pairs plus how many items had no link
#[derive(Debug, Default)]
pub struct RawItems {
    pub items: Vec<RawItem>,
    pub missing_link: usize,
}

/// Collect the raw pairs for one taxonomy level, in document order
pub fn extract_raw_items(html: &Html, selectors: &LevelSelectors) -> CrawlResult<RawItems> {
    let item_selector = compile(&selectors.item)?;
    let link_selector = compile(&selectors.link)?;

    let items: Vec<ElementRef> = match &selectors.container {
        Some(container) => {
            let container_selector = compile(container)?;
            html.select(&container_selector)
                .flat_map(|c| c.select(&item_selector).collect::<Vec<_>>())
                .collect()
        }
        None => html.select(&item_selector).collect(),
    };

    let mut raw = RawItems::default();
    for item in items {
        // Items without a link element carry no menu entry
        let Some(anchor) = item.select(&link_selector).next() else {
            continue;
        };
        let description = element_text(&anchor);
        match anchor.value().attr("href") {
            Some(href) => raw.items.push(RawItem {
                description,
                link: href.to_string(),
            }),
            None => {
                warn!(description = %description, "menu item has no href, skipping");
                raw.missing_link += 1;
            }
        }
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MENU: &str = r#"
        <ul>
          <li data-menu="1"><a href="/bebidas"> Bebidas </a></li>
          <li data-menu="2"><a href="/mercearia"><span>Mer</span> <span>cearia</span></a></li>
          <li data-menu="3"><a>Sem link</a></li>
          <li data-menu="4"><span>no anchor</span></li>
        </ul>
        <div class="submenu submenu--level-2">
          <ul><li class="submenu__item submenu__item--main"><a href="/bebidas/sucos">Sucos</a></li></ul>
        </div>
        <ul><li class="submenu__item submenu__item--main"><a href="/outside">Outside</a></li></ul>
    "#;

    #[test]
    fn test_extracts_pairs_in_document_order() {
        let html = Html::parse_document(MENU);
        let raw = extract_raw_items(&html, &LevelSelectors::new(None, "li[data-menu]")).unwrap();

        let pairs: Vec<(&str, &str)> = raw
            .items
            .iter()
            .map(|i| (i.description.as_str(), i.link.as_str()))
            .collect();
        assert_eq!(pairs, vec![("Bebidas", "/bebidas"), ("Mercearia", "/mercearia")]);
        assert_eq!(raw.missing_link, 1);
    }

    #[test]
    fn test_container_scopes_items() {
        let html = Html::parse_document(MENU);
        let selectors = LevelSelectors::new(
            Some("div.submenu.submenu--level-2"),
            "li.submenu__item.submenu__item--main",
        );
        let raw = extract_raw_items(&html, &selectors).unwrap();
        assert_eq!(raw.items.len(), 1);
        assert_eq!(raw.items[0].link, "/bebidas/sucos");
    }

    #[test]
    fn test_bad_selector_is_an_error() {
        let html = Html::parse_document(MENU);
        let err = extract_raw_items(&html, &LevelSelectors::new(None, "li[[")).unwrap_err();
        assert!(matches!(err, CrawlError::Selector { .. }));
    }
}
