//! Links handed to the view layer.

use common::token::Operation;
use url::Url;

/// Which file server endpoint family a transfer url targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlFlavor {
    /// Form posts from the browser
    Plain,
    /// Web API clients
    Api,
    /// Ajax uploads from the repository page
    Ajax,
}

impl UrlFlavor {
    fn suffix(&self) -> &'static str {
        match self {
            UrlFlavor::Plain => "",
            UrlFlavor::Api => "-api",
            UrlFlavor::Ajax => "-aj",
        }
    }
}

fn base(root: &Url) -> &str {
    root.as_str().trim_end_matches('/')
}

/// `{fileserver_root}/{op}{-api|-aj}/{token}`, e.g. `upload-blks-aj/<token>`.
///
/// Downloads always go through `files/`, whatever the flavor.
pub fn transfer_url(root: &Url, token: &str, operation: Operation, flavor: UrlFlavor) -> String {
    match operation {
        Operation::Download => format!("{}/{}/{}", base(root), operation.url_name(), token),
        _ => format!(
            "{}/{}{}/{}",
            base(root),
            operation.url_name(),
            flavor.suffix(),
            token
        ),
    }
}

/// Public link to a shared directory
pub fn dir_share_link(site_root: &Url, token: &str) -> String {
    format!("{}/d/{}/", base(site_root), token)
}

/// Public link to a directory upload link
pub fn upload_link(site_root: &Url, token: &str) -> String {
    format!("{}/u/d/{}/", base(site_root), token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Url {
        Url::parse("https://files.example.com/seafhttp/").unwrap()
    }

    #[test]
    fn test_transfer_urls() {
        assert_eq!(
            transfer_url(&root(), "t0k", Operation::Upload, UrlFlavor::Plain),
            "https://files.example.com/seafhttp/upload/t0k"
        );
        assert_eq!(
            transfer_url(&root(), "t0k", Operation::Update, UrlFlavor::Api),
            "https://files.example.com/seafhttp/update-api/t0k"
        );
        assert_eq!(
            transfer_url(&root(), "t0k", Operation::UploadBlocks, UrlFlavor::Ajax),
            "https://files.example.com/seafhttp/upload-blks-aj/t0k"
        );
        assert_eq!(
            transfer_url(&root(), "t0k", Operation::Download, UrlFlavor::Ajax),
            "https://files.example.com/seafhttp/files/t0k"
        );
    }

    #[test]
    fn test_share_links() {
        let site = Url::parse("https://cloud.example.com").unwrap();
        assert_eq!(dir_share_link(&site, "abc"), "https://cloud.example.com/d/abc/");
        assert_eq!(upload_link(&site, "abc"), "https://cloud.example.com/u/d/abc/");
    }
}
