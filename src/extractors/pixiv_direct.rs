//! Direct i.pximg.net image links: recover the artwork id and page index
//! from the filename and delegate to the Pixiv extractor for that page.

use url::Url;

use crate::error::ExtractResult;
use crate::extractors::{pixiv, Ctx};

pub async fn resolve(ctx: &Ctx, url: &Url) -> ExtractResult {
    let Some((_, illust_id, image_index)) =
        lazy_regex::regex_captures!(r"/(\d+)_p(\d+)(?:_\w+)?\.\w+$", url.path())
    else {
        log::info!("bad pixiv image url: {url}");
        return Ok(None);
    };

    let Ok(image_index) = image_index.parse::<u32>() else {
        return Ok(None);
    };

    let artwork_url = crate::classify::safe_parse_url(&format!("https://www.pixiv.net/en/artworks/{illust_id}"));
    pixiv::resolve_with_index(ctx, &artwork_url, Some(image_index)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_shapes() {
        fn rx_match(path: &str) -> Option<(&str, &str, &str)> {
            lazy_regex::regex_captures!(r"/(\d+)_p(\d+)(?:_\w+)?\.\w+$", path)
        }

        let (_, id, index) =
            rx_match("/img-original/img/2023/01/02/03/04/05/123456_p2.png").unwrap();
        assert_eq!(id, "123456");
        assert_eq!(index, "2");

        let (_, id, index) =
            rx_match("/img-master/img/2023/01/02/03/04/05/123456_p0_master1200.jpg").unwrap();
        assert_eq!(id, "123456");
        assert_eq!(index, "0");

        assert!(rx_match("/img/avatar.png").is_none());
    }
}
