use chrono::Utc;
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::hash::content_hashes;
use super::scanner::scan_images;
use super::{DatasetError, require_dir, require_disjoint, stem_of};
use crate::brand::{BrandMatch, Canonicalizer, MatchKind, REGISTRY_VERSION};

pub const SUMMARY_FILE_NAME: &str = "organize_summary.json";

/// How images and labels are arranged in the source dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLayout {
    /// `images/` and `labels/` side by side, as produced by the downloaders.
    Flat,
    /// Arbitrary folders with each label next to its image.
    Nested,
}

#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    /// Brands with fewer images than this are dropped.
    pub threshold: usize,
    pub dry_run: bool,
    /// Copy byte-identical images of the same brand only once.
    pub dedupe: bool,
    /// Skip files the image decoder cannot read.
    pub verify_images: bool,
    pub image_extensions: Vec<String>,
    pub label_extension: String,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            threshold: 0,
            dry_run: false,
            dedupe: false,
            verify_images: false,
            image_extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            label_extension: "txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub image: PathBuf,
    pub label: Option<PathBuf>,
    /// Parent folder name, unless the image sits at the images root.
    pub dir_name: Option<String>,
    pub stem: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    pub brand: String,
    pub image: PathBuf,
    pub label: Option<PathBuf>,
    pub dest_image: PathBuf,
    pub dest_label: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrganizeSummary {
    pub generated_at: String,
    pub registry_version: u32,
    pub source: String,
    pub output: String,
    pub dry_run: bool,
    pub total_images: usize,
    /// Images copied (or that would be, on a dry run).
    pub processed: usize,
    /// Images whose name yielded no usable brand.
    pub skipped: usize,
    pub below_threshold: usize,
    pub unreadable: usize,
    pub duplicates: usize,
    pub missing_labels: usize,
    pub labels_copied: usize,
    /// Processed images labelled from a cleaned, unregistered name.
    pub fallback_labels: usize,
    pub brands: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct OrganizePlan {
    pub layout: SourceLayout,
    pub copies: Vec<PlannedCopy>,
    pub summary: OrganizeSummary,
}

/// Sorts a flat or nested image dataset into `<output>/<brand>/` folders.
pub struct Organizer<'a> {
    canonicalizer: &'a Canonicalizer,
    options: OrganizeOptions,
}

impl<'a> Organizer<'a> {
    pub fn new(canonicalizer: &'a Canonicalizer, options: OrganizeOptions) -> Self {
        Self {
            canonicalizer,
            options,
        }
    }

    pub fn options(&self) -> &OrganizeOptions {
        &self.options
    }

    /// Plans and, unless this is a dry run, performs the copy.
    pub fn run(
        &self,
        source: &Path,
        output: &Path,
        progress: &ProgressBar,
    ) -> Result<OrganizeSummary, DatasetError> {
        let plan = self.plan(source, output, progress)?;
        if self.options.dry_run {
            return Ok(plan.summary);
        }
        self.execute(plan, output, progress)
    }

    pub fn discover(&self, source: &Path) -> Result<(SourceLayout, Vec<SourceImage>), DatasetError> {
        require_dir(source)?;

        let flat_images = source.join("images");
        let (layout, images_root, labels_root) = if flat_images.is_dir() {
            let labels = source.join("labels");
            if !labels.is_dir() {
                log::warn!("No labels directory at {}; copying images only", labels.display());
            }
            (SourceLayout::Flat, flat_images, Some(labels))
        } else {
            (SourceLayout::Nested, source.to_path_buf(), None)
        };

        let images = scan_images(&images_root, &self.options.image_extensions)?
            .into_iter()
            .map(|image| self.describe(&image, &images_root, labels_root.as_deref()))
            .collect();

        Ok((layout, images))
    }

    fn describe(&self, image: &Path, images_root: &Path, labels_root: Option<&Path>) -> SourceImage {
        let label_candidate = match labels_root {
            Some(labels_root) => image
                .strip_prefix(images_root)
                .map(|relative| labels_root.join(relative))
                .unwrap_or_else(|_| image.to_path_buf()),
            None => image.to_path_buf(),
        }
        .with_extension(&self.options.label_extension);

        let dir_name = image
            .parent()
            .filter(|parent| *parent != images_root)
            .and_then(|parent| parent.file_name())
            .map(|name| name.to_string_lossy().into_owned());

        SourceImage {
            image: image.to_path_buf(),
            label: label_candidate.is_file().then_some(label_candidate),
            dir_name,
            stem: stem_of(image),
        }
    }

    /// Resolves every image to a brand and decides where it goes. Touches
    /// nothing on disk.
    pub fn plan(
        &self,
        source: &Path,
        output: &Path,
        progress: &ProgressBar,
    ) -> Result<OrganizePlan, DatasetError> {
        require_disjoint(source, output)?;

        let (layout, mut images) = self.discover(source)?;
        let mut summary = OrganizeSummary {
            generated_at: Utc::now().to_rfc3339(),
            registry_version: REGISTRY_VERSION,
            source: source.display().to_string(),
            output: output.display().to_string(),
            dry_run: self.options.dry_run,
            total_images: images.len(),
            ..Default::default()
        };

        if self.options.verify_images {
            let before = images.len();
            images = images.into_par_iter().filter(is_readable_image).collect();
            summary.unreadable = before - images.len();
        }

        progress.set_length(images.len() as u64);
        progress.set_message("Resolving brands");
        let resolved: Vec<(SourceImage, Option<BrandMatch>)> = images
            .into_par_iter()
            .map(|image| {
                let found = self
                    .canonicalizer
                    .resolve_with_dir(image.dir_name.as_deref(), &image.stem);
                progress.inc(1);
                (image, found)
            })
            .collect();

        let mut by_brand: BTreeMap<String, Vec<(SourceImage, MatchKind)>> = BTreeMap::new();
        for (image, found) in resolved {
            match found {
                Some(found) => by_brand
                    .entry(found.brand)
                    .or_default()
                    .push((image, found.kind)),
                None => {
                    log::debug!("No usable brand for {}", image.image.display());
                    summary.skipped += 1;
                }
            }
        }

        if self.options.dedupe {
            for members in by_brand.values_mut() {
                summary.duplicates += drop_duplicates(members);
            }
        }

        by_brand.retain(|brand, members| {
            let keep = members.len() >= self.options.threshold;
            if !keep {
                log::debug!(
                    "Dropping {} ({} images, threshold {})",
                    brand,
                    members.len(),
                    self.options.threshold
                );
                summary.below_threshold += members.len();
            }
            keep
        });

        let mut copies = Vec::new();
        for (brand, members) in &by_brand {
            let brand_dir = output.join(brand);
            let mut taken = HashSet::new();

            for (image, kind) in members {
                let dest_image = unique_destination(&brand_dir, &image.image, &mut taken);
                let dest_label = image
                    .label
                    .as_ref()
                    .map(|_| dest_image.with_extension(&self.options.label_extension));

                if image.label.is_none() {
                    summary.missing_labels += 1;
                }
                if *kind == MatchKind::Fallback {
                    summary.fallback_labels += 1;
                }

                copies.push(PlannedCopy {
                    brand: brand.clone(),
                    image: image.image.clone(),
                    label: image.label.clone(),
                    dest_image,
                    dest_label,
                });
            }
            summary.brands.insert(brand.clone(), members.len());
        }
        summary.processed = copies.len();

        Ok(OrganizePlan {
            layout,
            copies,
            summary,
        })
    }

    /// Copies a plan into `output`, which the caller has already cleared, and
    /// writes the summary file next to the brand folders.
    pub fn execute(
        &self,
        plan: OrganizePlan,
        output: &Path,
        progress: &ProgressBar,
    ) -> Result<OrganizeSummary, DatasetError> {
        fs::create_dir_all(output)?;
        for brand in plan.summary.brands.keys() {
            fs::create_dir_all(output.join(brand))?;
        }

        progress.set_position(0);
        progress.set_length(plan.copies.len() as u64);
        progress.set_message("Copying");
        let labels_copied: usize = plan
            .copies
            .par_iter()
            .map(|copy| -> Result<usize, DatasetError> {
                fs::copy(&copy.image, &copy.dest_image)?;
                let copied_label = match (&copy.label, &copy.dest_label) {
                    (Some(label), Some(dest)) => {
                        fs::copy(label, dest)?;
                        1
                    }
                    _ => 0,
                };
                progress.inc(1);
                Ok(copied_label)
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .sum();

        let mut summary = plan.summary;
        summary.labels_copied = labels_copied;
        write_summary(&summary, &output.join(SUMMARY_FILE_NAME))?;
        Ok(summary)
    }
}

fn is_readable_image(image: &SourceImage) -> bool {
    match image::image_dimensions(&image.image) {
        Ok(_) => true,
        Err(err) => {
            log::warn!("Skipping unreadable image {}: {}", image.image.display(), err);
            false
        }
    }
}

/// Keeps the first of each group of byte-identical images, returning how
/// many were dropped. Files that cannot be hashed are kept.
fn drop_duplicates(members: &mut Vec<(SourceImage, MatchKind)>) -> usize {
    let paths: Vec<PathBuf> = members.iter().map(|(image, _)| image.image.clone()).collect();
    let hashes: HashMap<PathBuf, String> = content_hashes(&paths)
        .into_iter()
        .filter_map(|(path, hash)| match hash {
            Ok(hash) => Some((path, hash)),
            Err(err) => {
                log::warn!("Failed to hash {}: {}", path.display(), err);
                None
            }
        })
        .collect();

    let before = members.len();
    let mut seen = HashSet::new();
    members.retain(|(image, _)| match hashes.get(&image.image) {
        Some(hash) => seen.insert(hash.clone()),
        None => true,
    });
    before - members.len()
}

/// `<dir>/<file name>`, with `-1`, `-2`, ... appended to the stem when another
/// image already claimed it. Stems are reserved rather than file names so that
/// `logo.png` and `logo.jpg` never share `logo.txt`.
fn unique_destination(dir: &Path, image: &Path, taken: &mut HashSet<String>) -> PathBuf {
    let stem = stem_of(image);
    let extension = image
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    if taken.insert(stem.clone()) {
        return dir.join(format!("{stem}{extension}"));
    }

    let mut n = 1;
    loop {
        let candidate = format!("{stem}-{n}");
        if taken.insert(candidate.clone()) {
            return dir.join(format!("{candidate}{extension}"));
        }
        n += 1;
    }
}

pub fn write_summary(summary: &OrganizeSummary, path: &Path) -> Result<(), DatasetError> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json)?;
    Ok(())
}
