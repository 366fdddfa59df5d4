use crate::{BrowserError, BrowserSession, LaunchOptions};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::Page;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Chrome driven over the DevTools protocol.
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
    closed: bool,
}

impl ChromiumSession {
    pub async fn launch(opts: &LaunchOptions) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder();
        if !opts.headless {
            builder = builder.with_head();
        }
        if opts.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(exe) = &opts.executable {
            builder = builder.chrome_executable(exe);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut events) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    debug!("browser event error: {}", e);
                }
            }
        });

        let download_path = opts.download_dir.to_string_lossy().into_owned();
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(download_path.clone())
            .build()
            .map_err(BrowserError::Launch)?;
        browser.execute(params).await?;
        info!("Browser launched; downloads go to {}", download_path);

        Ok(Self {
            browser,
            handler,
            page: None,
            closed: false,
        })
    }
}

#[async_trait::async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        match &self.page {
            Some(page) => {
                page.goto(url).await?;
            }
            None => {
                self.page = Some(self.browser.new_page(url).await?);
            }
        }
        debug!("navigated to {}", url);
        Ok(())
    }

    async fn click_link(&mut self, text: &str) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        let page = self.page.as_ref().ok_or(BrowserError::NoPage)?;
        for link in page.find_elements("a").await? {
            let visible = link.inner_text().await?.unwrap_or_default();
            if visible.trim() == text {
                link.click().await?;
                debug!("clicked link {:?}", text);
                return Ok(());
            }
        }
        Err(BrowserError::LinkNotFound(text.to_string()))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        self.closed = true;
        self.page = None;
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("waiting for browser process failed: {}", e);
        }
        self.handler.abort();
        closed?;
        info!("Browser closed");
        Ok(())
    }
}
