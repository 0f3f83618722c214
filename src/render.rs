use minijinja::{context, Environment};

use crate::types::api::PasteContent;

const PAGE_TEMPLATE: &str = "page.html";

/// HTML pages for the browser view of a paste. Values are auto-escaped.
#[derive(Debug)]
pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(PAGE_TEMPLATE, include_str!("../assets/page.html"))?;
        Ok(Pages { env })
    }

    pub fn paste(&self, paste: &PasteContent) -> Result<String, minijinja::Error> {
        self.env.get_template(PAGE_TEMPLATE)?.render(context! {
            title => "Paste",
            is_error => false,
            content => &paste.content,
            remaining_views => paste.remaining_views,
            expires_at => &paste.expires_at,
        })
    }

    pub fn error(&self, title: &str, message: &str) -> Result<String, minijinja::Error> {
        self.env.get_template(PAGE_TEMPLATE)?.render(context! {
            title => title,
            is_error => true,
            message => message,
        })
    }
}
