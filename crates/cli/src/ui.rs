use crate::style::Style;

const KEY_WIDTH: usize = 18;
const LABEL_WIDTH: usize = 36;

pub struct Ui {
    style: Style,
    width: usize,
}

impl Ui {
    pub fn new(style: Style) -> Self {
        Self { style, width: 48 }
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn rule(&self) -> String {
        "-".repeat(self.width)
    }

    pub fn header(&self, title: &str) -> Vec<String> {
        vec![self.rule(), title.to_string(), self.rule()]
    }

    pub fn kv(&self, key: &str, value: &str) -> String {
        format!("{key:<KEY_WIDTH$}: {value}")
    }

    pub fn info_line(&self, message: &str) -> String {
        format!("{} {}", self.style.arrow(), message)
    }

    pub fn ok_line(&self, message: &str) -> String {
        format!("{} {}", self.style.ok(), message)
    }

    pub fn warn_line(&self, message: &str) -> String {
        format!("{} {}", self.style.warn(), message)
    }

    /// `  ✔ 001_init.sql.................... applied (12 ms)`
    pub fn item(&self, marker: &str, label: &str, status: &str) -> String {
        let dots = ".".repeat(LABEL_WIDTH.saturating_sub(label.chars().count()));
        format!("  {marker} {label}{dots} {status}")
    }
}
