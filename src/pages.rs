//! Server-rendered pages of the dashboard.

use minijinja::Environment;
use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::Result;

const TEMPLATES: [(&str, &str); 5] = [
    ("base.html", include_str!("../templates/base.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("info.html", include_str!("../templates/info.html")),
    ("recognition.html", include_str!("../templates/recognition.html")),
    ("about.html", include_str!("../templates/about.html")),
];

/// Sidebar entries, in display order. Parsed from and printed as URL slugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Page {
    #[default]
    Home,
    Info,
    DiseaseRecognition,
    AboutUs,
}

impl Page {
    pub fn title(self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::Info => "Info",
            Page::DiseaseRecognition => "Disease Recognition",
            Page::AboutUs => "About Us",
        }
    }

    fn template(self) -> &'static str {
        match self {
            Page::Home => "home.html",
            Page::Info => "info.html",
            Page::DiseaseRecognition => "recognition.html",
            Page::AboutUs => "about.html",
        }
    }
}

#[derive(Debug, Serialize)]
struct NavItem {
    slug: String,
    title: &'static str,
    active: bool,
}

/// Result block on the recognition page
#[derive(Debug, Clone, Serialize)]
pub struct PredictionView {
    pub label: String,
    pub summary: String,
}

/// Descriptive text block
#[derive(Debug, Clone, Serialize)]
pub struct InfoView {
    pub label: String,
    pub text: String,
}

/// Everything a page may show; unused fields stay empty.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageView {
    /// Persistent warning shown while the model is unavailable
    pub model_error: Option<String>,

    /// Inline error of the last action
    pub error: Option<String>,

    /// Labels selectable on the info page
    pub info_labels: Vec<String>,

    pub selected_label: Option<String>,

    pub info: Option<InfoView>,

    /// `data:` URI of the uploaded image
    pub uploaded_image: Option<String>,

    pub prediction: Option<PredictionView>,

    /// Whether the session holds a prediction to show information for
    pub can_show_info: bool,
}

pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    pub fn render(&self, page: Page, view: &PageView) -> Result<String> {
        let nav: Vec<NavItem> = Page::iter()
            .map(|p| NavItem {
                slug: p.to_string(),
                title: p.title(),
                active: p == page,
            })
            .collect();

        let template = self.env.get_template(page.template())?;
        let html = template.render(minijinja::context! {
            title => page.title(),
            nav => nav,
            view => view,
        })?;
        Ok(html)
    }
}
