//! Reference symbol templates and the frozen set a scan matches against.

use crate::image::decode::load_gray_image;
use crate::image::{ImageView, OwnedImage};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::fs::list_files_with_extensions;
use crate::util::{SymMatchError, SymMatchResult};
use std::path::{Path, PathBuf};

mod plan;

pub use plan::TemplatePlan;

/// Default cap on the number of templates in one scan.
pub const DEFAULT_MAX_TEMPLATES: usize = 9;

/// File extensions picked up when templates are given as a folder.
pub const TEMPLATE_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

/// Named grayscale template with its precomputed ZNCC plan.
#[derive(Clone, Debug)]
pub struct Template {
    name: String,
    img: OwnedImage,
    plan: TemplatePlan,
}

impl Template {
    /// Creates a template from a contiguous grayscale buffer.
    pub fn new(
        name: impl Into<String>,
        data: Vec<u8>,
        width: usize,
        height: usize,
    ) -> SymMatchResult<Self> {
        Self::from_image(name, OwnedImage::new(data, width, height)?)
    }

    /// Creates a template from an owned grayscale image.
    pub fn from_image(name: impl Into<String>, img: OwnedImage) -> SymMatchResult<Self> {
        let plan = TemplatePlan::from_view(img.view())?;
        Ok(Self {
            name: name.into(),
            img,
            plan,
        })
    }

    /// Loads a template from an image file, named after its file name.
    ///
    /// Any decode failure is reported as `TemplateLoad`. A uniform image
    /// loads but never matches.
    pub fn load<P: AsRef<Path>>(path: P) -> SymMatchResult<Self> {
        let path = path.as_ref();
        let load_err = |err: SymMatchError| SymMatchError::TemplateLoad {
            path: path.to_path_buf(),
            reason: err.to_string(),
        };
        let img = load_gray_image(path).map_err(load_err)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_image(name, img).map_err(load_err)
    }

    /// Returns the template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.img.width()
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.img.height()
    }

    /// Returns a borrowed view of the template data.
    pub fn view(&self) -> ImageView<'_, u8> {
        self.img.view()
    }

    /// Returns the precomputed matching plan.
    pub fn plan(&self) -> &TemplatePlan {
        &self.plan
    }
}

/// Ordered, immutable set of templates. A template's position is its index
/// in match records.
#[derive(Clone, Debug)]
pub struct TemplateSet {
    templates: Vec<Template>,
}

impl TemplateSet {
    /// Freezes `templates`, failing if there are more than `max_templates`.
    pub fn new(templates: Vec<Template>, max_templates: usize) -> SymMatchResult<Self> {
        check_count(templates.len(), max_templates)?;
        Ok(Self { templates })
    }

    /// Number of templates in the set.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true if the set holds no template.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Returns the template at `index`.
    pub fn get(&self, index: usize) -> Option<&Template> {
        self.templates.get(index)
    }

    /// Iterates templates in set order.
    pub fn iter(&self) -> std::slice::Iter<'_, Template> {
        self.templates.iter()
    }
}

impl<'a> IntoIterator for &'a TemplateSet {
    type Item = &'a Template;
    type IntoIter = std::slice::Iter<'a, Template>;

    fn into_iter(self) -> Self::IntoIter {
        self.templates.iter()
    }
}

fn check_count(count: usize, max: usize) -> SymMatchResult<()> {
    if count > max {
        return Err(SymMatchError::TooManyTemplates { count, max });
    }
    Ok(())
}

/// Loads every template in `paths`, in order.
///
/// The count is checked before any file is read. The first file that fails
/// to load aborts the whole operation; no partial set is returned.
pub fn load_templates<P: AsRef<Path>>(
    paths: &[P],
    max_templates: usize,
) -> SymMatchResult<TemplateSet> {
    let _span = trace_span!("load_templates", count = paths.len()).entered();
    check_count(paths.len(), max_templates)?;

    let templates = paths
        .iter()
        .map(Template::load)
        .collect::<SymMatchResult<Vec<_>>>()?;
    for (index, tpl) in templates.iter().enumerate() {
        trace_event!(
            "template_loaded",
            index = index,
            name = tpl.name(),
            width = tpl.width(),
            height = tpl.height()
        );
        if tpl.plan().is_flat() {
            trace_warn!("template_flat", index = index, name = tpl.name());
        }
    }
    TemplateSet::new(templates, max_templates)
}

/// Lists template image files in `dir`, sorted by path.
pub fn collect_template_paths(dir: &Path) -> SymMatchResult<Vec<PathBuf>> {
    list_files_with_extensions(dir, TEMPLATE_EXTENSIONS)
}

#[cfg(test)]
mod tests {
    use super::{Template, TemplateSet};
    use crate::SymMatchError;

    #[test]
    fn set_rejects_more_than_max() {
        let tpl = Template::new("t", vec![0, 1, 2, 3], 2, 2).unwrap();
        let err = TemplateSet::new(vec![tpl.clone(), tpl.clone(), tpl], 2).unwrap_err();
        assert_eq!(err, SymMatchError::TooManyTemplates { count: 3, max: 2 });
    }

    #[test]
    fn template_exposes_name_and_size() {
        let tpl = Template::new("glyph", vec![0, 255, 255, 0, 0, 255], 3, 2).unwrap();
        assert_eq!(tpl.name(), "glyph");
        assert_eq!((tpl.width(), tpl.height()), (3, 2));
        assert_eq!(tpl.plan().width(), 3);
    }
}
