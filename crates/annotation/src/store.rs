use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use image::RgbImage;
use mask::{BinaryMask, CocoRleCodec, MaskCodec, Segmentation};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    display::DisplayGeometry,
    error::{AnnotationError, Result},
    label_map::LabelMap,
    types::{AnnotationDocument, AnnotationRecord, DatasetEntry, DEFAULT_CATEGORY_ID},
};

/// One image with its decoded instance masks and annotation records.
///
/// `instance_masks()[i]` is always the decoded mask of `records()[i]`.
pub struct AnnotationStore<C = CocoRleCodec>
where
    C: MaskCodec<Encoded = Segmentation>,
{
    entry: DatasetEntry,
    image: RgbImage,
    document: AnnotationDocument,
    instance_masks: Vec<BinaryMask>,
    codec: C,
    default_category_id: u64,
}

impl AnnotationStore<CocoRleCodec> {
    /// Load an image and its annotation file using the COCO RLE codec
    pub fn load(image_path: impl AsRef<Path>, annotation_path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_codec(image_path, annotation_path, CocoRleCodec)
    }

    /// Load the pair described by a dataset entry
    pub fn load_entry(entry: &DatasetEntry) -> Result<Self> {
        Self::load(&entry.image_path, &entry.annotation_path)
    }
}

impl<C> AnnotationStore<C>
where
    C: MaskCodec<Encoded = Segmentation>,
{
    pub fn load_with_codec(
        image_path: impl AsRef<Path>,
        annotation_path: impl AsRef<Path>,
        codec: C,
    ) -> Result<Self> {
        let image_path = image_path.as_ref();
        let annotation_path = annotation_path.as_ref();

        let image = image::open(image_path)
            .map_err(|source| AnnotationError::ImageLoad {
                path: image_path.to_path_buf(),
                source,
            })?
            .to_rgb8();

        let content = fs::read_to_string(annotation_path).map_err(|source| AnnotationError::Read {
            path: annotation_path.to_path_buf(),
            source,
        })?;
        let document: AnnotationDocument =
            serde_json::from_str(&content).map_err(|source| AnnotationError::Parse {
                path: annotation_path.to_path_buf(),
                source,
            })?;

        let instance_masks = document
            .annotations
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let decoded = codec
                    .decode(&record.segmentation)
                    .and_then(|mask| mask.ensure_dimensions(image.width(), image.height()).map(|_| mask));
                decoded.map_err(|source| AnnotationError::Segmentation {
                    path: annotation_path.to_path_buf(),
                    index,
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            image = %image_path.display(),
            annotations = %annotation_path.display(),
            n_labels = instance_masks.len(),
            "Loaded image and annotations"
        );

        Ok(Self {
            entry: DatasetEntry::new(image_path, annotation_path),
            image,
            document,
            instance_masks,
            codec,
            default_category_id: DEFAULT_CATEGORY_ID,
        })
    }

    /// Category id given to records created by `update_instance`
    pub fn with_default_category(mut self, category_id: u64) -> Self {
        self.default_category_id = category_id;
        self
    }

    pub fn entry(&self) -> &DatasetEntry {
        &self.entry
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.document.annotations
    }

    pub fn instance_masks(&self) -> &[BinaryMask] {
        &self.instance_masks
    }

    pub fn n_labels(&self) -> usize {
        self.instance_masks.len()
    }

    /// Per-pixel instance ownership, recomputed on every call
    pub fn label_map(&self) -> LabelMap {
        LabelMap::from_masks(self.image.width(), self.image.height(), &self.instance_masks)
    }

    /// Box polygons, instance labels and styling for the overlay
    pub fn display_geometry(&self) -> DisplayGeometry {
        DisplayGeometry::from_records(&self.document.annotations, self.image.width(), self.image.height())
    }

    /// Replace instance `instance_id` with zero or more new instances and rewrite the file.
    ///
    /// New records are appended in the order given, each with the default
    /// category and the tight bbox of its mask. The new state is written to disk
    /// first and only then swapped in, so a failed write leaves the store untouched.
    pub fn update_instance(&mut self, instance_id: usize, replacement_masks: &[BinaryMask]) -> Result<()> {
        let n_labels = self.n_labels();
        if instance_id >= n_labels {
            return Err(AnnotationError::InstanceOutOfRange { instance_id, n_labels });
        }
        for mask in replacement_masks {
            mask.ensure_dimensions(self.image.width(), self.image.height())?;
        }

        let capacity = n_labels - 1 + replacement_masks.len();
        let mut annotations = Vec::with_capacity(capacity);
        let mut instance_masks = Vec::with_capacity(capacity);

        for (i, (record, mask)) in self.document.annotations.iter().zip(&self.instance_masks).enumerate() {
            if i != instance_id {
                annotations.push(record.clone());
                instance_masks.push(mask.clone());
            }
        }

        for mask in replacement_masks {
            let segmentation = self.codec.encode(mask);
            let decoded = self.codec.decode(&segmentation)?;
            let bbox = mask.bounding_box();
            debug!(?bbox, area = mask.area(), "Appending split instance");

            annotations.push(AnnotationRecord::new(segmentation, bbox, self.default_category_id));
            instance_masks.push(decoded);
        }

        let document = AnnotationDocument {
            annotations,
            extra: self.document.extra.clone(),
        };
        write_document(&self.entry.annotation_path, &document)?;

        self.document = document;
        self.instance_masks = instance_masks;

        info!(
            instance_id,
            replacements = replacement_masks.len(),
            n_labels = self.n_labels(),
            path = %self.entry.annotation_path.display(),
            "Updated instance"
        );
        Ok(())
    }
}

/// Serialize with 4-space indentation into a temp file beside `path`, then rename over it
fn write_document(path: &Path, document: &AnnotationDocument) -> Result<()> {
    let write_err = |source: std::io::Error| AnnotationError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        document.serialize(&mut serializer)?;
        writer.flush().map_err(write_err)?;
    }
    temp.as_file().sync_all().map_err(write_err)?;

    // keep the mode of the file being replaced, temp files start out owner-only
    match fs::metadata(path) {
        Ok(existing) => temp.as_file().set_permissions(existing.permissions()).map_err(write_err)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(write_err(err)),
    }
    temp.persist(path).map_err(|e| write_err(e.error))?;

    debug!(path = %path.display(), records = document.annotations.len(), "Wrote annotation file");
    Ok(())
}
