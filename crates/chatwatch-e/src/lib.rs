//! Backend for an externally running WebDriver server (chromedriver and friends).

pub mod backend;
pub mod webdriver;

pub use backend::WebDriverBackend;
pub use webdriver::DriverOptions;
