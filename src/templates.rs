use askama::Template;

/// Admin routes that get the editor bootstrap fragment.
pub const INJECTOR_ROUTES: &[&str] = &["bolt_content_edit", "bolt_content_new", "bolt_content_duplicate"];

#[derive(Template)]
#[template(path = "injector.html")]
pub struct InjectorTemplate<'a> {
    pub images_url: &'a str,
    pub files_url: &'a str,
    pub upload_url: &'a str,
    pub max_upload_size: u64,
}

/// Render the fragment for `route`, or `None` when the route does not edit
/// a record.
pub fn render_injector(route: &str, max_upload_size: u64) -> Result<Option<String>, askama::Error> {
    if !INJECTOR_ROUTES.contains(&route) {
        return Ok(None);
    }

    let template = InjectorTemplate {
        images_url: "/redactor_images",
        files_url: "/redactor_files",
        upload_url: "/redactor_upload",
        max_upload_size,
    };
    template.render().map(Some)
}
