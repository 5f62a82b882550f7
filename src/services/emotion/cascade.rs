//! Boosted Haar-feature cascades in OpenCV's XML format
//!
//! Only upright HAAR cascades are supported (the stock frontal face and smile
//! cascades). Detection runs the cascade over an image pyramid and merges
//! overlapping hits the same way OpenCV's `groupRectangles` does, so the
//! `min_neighbors` values tuned for OpenCV carry over.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use image::{
    imageops::{self, FilterType},
    GrayImage,
};
use serde::Deserialize;

use super::{DetectorError, Region, RegionDetector};

/// Relative size tolerance when merging neighbouring detections
pub const GROUP_EPS: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectParams {
    /// Pyramid step, must be greater than 1
    pub scale_factor: f64,
    /// Raw hits a merged region needs (strictly more than this) to survive
    pub min_neighbors: usize,
}

impl DetectParams {
    pub const FACE: DetectParams = DetectParams {
        scale_factor: 1.1,
        min_neighbors: 4,
    };

    pub const SMILE: DetectParams = DetectParams {
        scale_factor: 1.8,
        min_neighbors: 20,
    };
}

// ----------------------------------------------------------------------------
// XML layout
// ----------------------------------------------------------------------------

#[derive(Deserialize)]
struct StorageXml {
    cascade: CascadeXml,
}

#[derive(Deserialize)]
struct CascadeXml {
    #[serde(rename = "featureType")]
    feature_type: String,
    height: u32,
    width: u32,
    stages: ListXml<StageXml>,
    features: ListXml<FeatureXml>,
}

/// OpenCV writes sequence items as `<_>` elements
#[derive(Deserialize)]
struct ListXml<T> {
    #[serde(rename = "_", default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
struct StageXml {
    #[serde(rename = "stageThreshold")]
    stage_threshold: f64,
    #[serde(rename = "weakClassifiers")]
    weak_classifiers: ListXml<WeakClassifierXml>,
}

#[derive(Deserialize)]
struct WeakClassifierXml {
    #[serde(rename = "internalNodes")]
    internal_nodes: String,
    #[serde(rename = "leafValues")]
    leaf_values: String,
}

#[derive(Deserialize)]
struct FeatureXml {
    rects: ListXml<String>,
    #[serde(default)]
    tilted: Option<u8>,
}

// ----------------------------------------------------------------------------
// Parsed cascade
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct WeightedRect {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    weight: f64,
}

#[derive(Debug, Clone)]
struct Feature {
    rects: Vec<WeightedRect>,
}

/// Children `<= 0` are leaf indices (negated), positive ones are nodes
#[derive(Debug, Clone, Copy)]
struct Node {
    left: i32,
    right: i32,
    feature: usize,
    threshold: f64,
}

#[derive(Debug, Clone)]
struct WeakClassifier {
    nodes: Vec<Node>,
    leaves: Vec<f64>,
}

#[derive(Debug, Clone)]
struct Stage {
    threshold: f64,
    classifiers: Vec<WeakClassifier>,
}

#[derive(Debug, Clone)]
pub struct HaarCascade {
    width: usize,
    height: usize,
    stages: Vec<Stage>,
    features: Vec<Feature>,
}

fn numbers(text: &str) -> Result<Vec<f64>, DetectorError> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| DetectorError::Parse(format!("bad number {:?}", token)))
        })
        .collect()
}

fn parse_feature(raw: FeatureXml, width: usize, height: usize) -> Result<Feature, DetectorError> {
    if raw.tilted.unwrap_or(0) != 0 {
        return Err(DetectorError::Unsupported("tilted features".to_string()));
    }

    let mut rects = Vec::with_capacity(raw.rects.items.len());
    for text in &raw.rects.items {
        let values = numbers(text)?;
        let [x, y, w, h, weight] = values[..] else {
            return Err(DetectorError::Parse(format!("rect needs 5 values: {:?}", text)));
        };
        if x < 0.0 || y < 0.0 || w <= 0.0 || h <= 0.0 {
            return Err(DetectorError::Parse(format!("negative rect: {:?}", text)));
        }
        let rect = WeightedRect {
            x: x as usize,
            y: y as usize,
            width: w as usize,
            height: h as usize,
            weight,
        };
        if rect.x + rect.width > width || rect.y + rect.height > height {
            return Err(DetectorError::Parse(format!("rect outside window: {:?}", text)));
        }
        rects.push(rect);
    }

    if rects.is_empty() {
        return Err(DetectorError::Parse("feature without rects".to_string()));
    }
    Ok(Feature { rects })
}

fn parse_weak_classifier(
    raw: &WeakClassifierXml,
    feature_count: usize,
) -> Result<WeakClassifier, DetectorError> {
    let values = numbers(&raw.internal_nodes)?;
    let leaves = numbers(&raw.leaf_values)?;

    if values.is_empty() || values.len() % 4 != 0 {
        return Err(DetectorError::Parse(format!(
            "internal nodes come in groups of 4, got {}",
            values.len()
        )));
    }

    let nodes: Vec<Node> = values
        .chunks_exact(4)
        .map(|chunk| Node {
            left: chunk[0] as i32,
            right: chunk[1] as i32,
            feature: chunk[2] as usize,
            threshold: chunk[3],
        })
        .collect();

    for (index, node) in nodes.iter().enumerate() {
        if node.feature >= feature_count {
            return Err(DetectorError::Parse(format!("unknown feature {}", node.feature)));
        }
        for child in [node.left, node.right] {
            let valid = if child > 0 {
                // Forward references only, so evaluation always terminates
                (child as usize) > index && (child as usize) < nodes.len()
            } else {
                (child.unsigned_abs() as usize) < leaves.len()
            };
            if !valid {
                return Err(DetectorError::Parse(format!("dangling child {}", child)));
            }
        }
    }

    Ok(WeakClassifier { nodes, leaves })
}

/// Summed-area tables of pixel values and squared pixel values
struct IntegralImage {
    stride: usize,
    sum: Vec<f64>,
    sq_sum: Vec<f64>,
}

impl IntegralImage {
    fn new(image: &GrayImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let stride = width + 1;
        let mut sum = vec![0.0; stride * (height + 1)];
        let mut sq_sum = vec![0.0; stride * (height + 1)];
        let pixels = image.as_raw();

        for y in 0..height {
            let (mut row, mut row_sq) = (0.0, 0.0);
            for x in 0..width {
                let value = pixels[y * width + x] as f64;
                row += value;
                row_sq += value * value;
                let i = (y + 1) * stride + x + 1;
                sum[i] = sum[i - stride] + row;
                sq_sum[i] = sq_sum[i - stride] + row_sq;
            }
        }

        Self {
            stride,
            sum,
            sq_sum,
        }
    }

    fn area(&self, table: &[f64], x: usize, y: usize, width: usize, height: usize) -> f64 {
        let top_left = y * self.stride + x;
        let bottom_left = (y + height) * self.stride + x;
        table[bottom_left + width] - table[top_left + width] - table[bottom_left] + table[top_left]
    }
}

impl HaarCascade {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DetectorError> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|source| DetectorError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_xml(&xml)
    }

    pub fn from_xml(xml: &str) -> Result<Self, DetectorError> {
        let storage: StorageXml =
            quick_xml::de::from_str(xml).map_err(|e| DetectorError::Parse(e.to_string()))?;
        let raw = storage.cascade;

        if !raw.feature_type.trim().eq_ignore_ascii_case("HAAR") {
            return Err(DetectorError::Unsupported(format!(
                "feature type {}",
                raw.feature_type.trim()
            )));
        }
        if raw.width < 3 || raw.height < 3 {
            return Err(DetectorError::Parse(format!(
                "window {}x{} is too small",
                raw.width, raw.height
            )));
        }

        let (width, height) = (raw.width as usize, raw.height as usize);
        let features = raw
            .features
            .items
            .into_iter()
            .map(|feature| parse_feature(feature, width, height))
            .collect::<Result<Vec<_>, _>>()?;

        let stages = raw
            .stages
            .items
            .iter()
            .map(|stage| {
                Ok(Stage {
                    threshold: stage.stage_threshold,
                    classifiers: stage
                        .weak_classifiers
                        .items
                        .iter()
                        .map(|weak| parse_weak_classifier(weak, features.len()))
                        .collect::<Result<Vec<_>, _>>()?,
                })
            })
            .collect::<Result<Vec<_>, DetectorError>>()?;

        if stages.is_empty() {
            return Err(DetectorError::Parse("cascade without stages".to_string()));
        }

        Ok(Self {
            width,
            height,
            stages,
            features,
        })
    }

    /// Detection window size the cascade was trained on
    pub fn window(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    /// Evaluates the window whose top-left corner is `(x, y)`.
    ///
    /// Returns 1 when every stage accepts, otherwise minus the index of the
    /// rejecting stage (so 0 means the first stage already rejected).
    fn run_at(&self, integral: &IntegralImage, x: usize, y: usize) -> i32 {
        let (inner_w, inner_h) = (self.width - 2, self.height - 2);
        let area = (inner_w * inner_h) as f64;
        let sum = integral.area(&integral.sum, x + 1, y + 1, inner_w, inner_h);
        let sq_sum = integral.area(&integral.sq_sum, x + 1, y + 1, inner_w, inner_h);
        let norm = area * sq_sum - sum * sum;
        let norm = if norm > 0.0 { norm.sqrt() } else { 1.0 };

        for (index, stage) in self.stages.iter().enumerate() {
            let mut total = 0.0;
            for weak in &stage.classifiers {
                let mut idx = 0i32;
                loop {
                    let node = weak.nodes[idx as usize];
                    let weighted: f64 = self.features[node.feature]
                        .rects
                        .iter()
                        .map(|r| {
                            r.weight * integral.area(&integral.sum, x + r.x, y + r.y, r.width, r.height)
                        })
                        .sum();
                    let value = weighted / norm;
                    idx = if value < node.threshold {
                        node.left
                    } else {
                        node.right
                    };
                    if idx <= 0 {
                        break;
                    }
                }
                total += weak.leaves[idx.unsigned_abs() as usize];
            }
            if total < stage.threshold {
                return -(index as i32);
            }
        }
        1
    }

    /// Multi-scale detection followed by neighbour grouping
    pub fn detect_multi_scale(
        &self,
        image: &GrayImage,
        params: DetectParams,
    ) -> Result<Vec<Region>, DetectorError> {
        if params.scale_factor.is_nan() || params.scale_factor <= 1.0 {
            return Err(DetectorError::InvalidParams(format!(
                "scale factor {} must be greater than 1",
                params.scale_factor
            )));
        }

        let (image_w, image_h) = image.dimensions();
        let mut candidates = Vec::new();
        let mut factor = 1.0f64;

        loop {
            let scaled_w = (image_w as f64 / factor).round() as u32;
            let scaled_h = (image_h as f64 / factor).round() as u32;
            if (scaled_w as usize) < self.width || (scaled_h as usize) < self.height {
                break;
            }

            let window_w = (self.width as f64 * factor).round() as u32;
            let window_h = (self.height as f64 * factor).round() as u32;
            if window_w > image_w || window_h > image_h {
                break;
            }

            let scaled = if (scaled_w, scaled_h) == (image_w, image_h) {
                Cow::Borrowed(image)
            } else {
                Cow::Owned(imageops::resize(image, scaled_w, scaled_h, FilterType::Triangle))
            };
            let integral = IntegralImage::new(&scaled);

            let step = if factor > 2.0 { 1 } else { 2 };
            let max_x = scaled_w as usize - self.width;
            let max_y = scaled_h as usize - self.height;

            let mut y = 0;
            while y <= max_y {
                let mut x = 0;
                while x <= max_x {
                    let result = self.run_at(&integral, x, y);
                    if result > 0 {
                        candidates.push(Region {
                            x: (x as f64 * factor).round() as u32,
                            y: (y as f64 * factor).round() as u32,
                            width: window_w,
                            height: window_h,
                        });
                    }
                    if result == 0 {
                        x += step;
                    }
                    x += step;
                }
                y += step;
            }

            factor *= params.scale_factor;
        }

        tracing::trace!(candidates = candidates.len(), "Cascade pass finished");
        Ok(group_rectangles(candidates, params.min_neighbors, GROUP_EPS))
    }
}

fn is_similar(a: &Region, b: &Region, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    let close = |p: u32, q: u32| (p as f64 - q as f64).abs() <= delta;
    close(a.x, b.x)
        && close(a.y, b.y)
        && close(a.x + a.width, b.x + b.width)
        && close(a.y + a.height, b.y + b.height)
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Clusters similar rectangles, averages each cluster and keeps clusters with
/// more than `group_threshold` members that are not nested inside a stronger
/// cluster. A threshold of zero returns the input untouched.
pub fn group_rectangles(rects: Vec<Region>, group_threshold: usize, eps: f64) -> Vec<Region> {
    if group_threshold == 0 || rects.is_empty() {
        return rects;
    }

    let n = rects.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if is_similar(&rects[i], &rects[j], eps) {
                let (a, b) = (find_root(&mut parent, i), find_root(&mut parent, j));
                if a != b {
                    parent[b] = a;
                }
            }
        }
    }

    // Cluster labels follow the order in which clusters first appear
    let mut label_of_root: HashMap<usize, usize> = HashMap::new();
    let mut sums: Vec<[f64; 4]> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for (i, rect) in rects.iter().enumerate() {
        let root = find_root(&mut parent, i);
        let next = label_of_root.len();
        let label = *label_of_root.entry(root).or_insert(next);
        if label == sums.len() {
            sums.push([0.0; 4]);
            counts.push(0);
        }
        let sum = &mut sums[label];
        sum[0] += rect.x as f64;
        sum[1] += rect.y as f64;
        sum[2] += rect.width as f64;
        sum[3] += rect.height as f64;
        counts[label] += 1;
    }

    let averaged: Vec<Region> = sums
        .iter()
        .zip(&counts)
        .map(|(sum, &count)| {
            let k = count as f64;
            Region {
                x: (sum[0] / k).round() as u32,
                y: (sum[1] / k).round() as u32,
                width: (sum[2] / k).round() as u32,
                height: (sum[3] / k).round() as u32,
            }
        })
        .collect();

    let mut grouped = Vec::new();
    for (i, inner) in averaged.iter().enumerate() {
        let inner_count = counts[i];
        if inner_count <= group_threshold {
            continue;
        }

        let nested = averaged.iter().enumerate().any(|(j, outer)| {
            let outer_count = counts[j];
            if j == i || outer_count <= group_threshold {
                return false;
            }
            let dx = (outer.width as f64 * eps).round() as i64;
            let dy = (outer.height as f64 * eps).round() as i64;
            let (ix, iy, iw, ih) = (inner.x as i64, inner.y as i64, inner.width as i64, inner.height as i64);
            let (ox, oy, ow, oh) = (outer.x as i64, outer.y as i64, outer.width as i64, outer.height as i64);

            ix >= ox - dx
                && iy >= oy - dy
                && ix + iw <= ox + ow + dx
                && iy + ih <= oy + oh + dy
                && (outer_count > inner_count.max(3) || inner_count < 3)
        });

        if !nested {
            grouped.push(*inner);
        }
    }

    grouped
}

/// A cascade bound to its detection parameters
pub struct CascadeDetector {
    cascade: HaarCascade,
    params: DetectParams,
}

impl CascadeDetector {
    pub fn new(cascade: HaarCascade, params: DetectParams) -> Self {
        Self { cascade, params }
    }

    pub fn from_file(path: impl AsRef<Path>, params: DetectParams) -> Result<Self, DetectorError> {
        Ok(Self::new(HaarCascade::from_file(path)?, params))
    }
}

impl RegionDetector for CascadeDetector {
    fn detect(&self, image: &GrayImage) -> Result<Vec<Region>, DetectorError> {
        self.cascade.detect_multi_scale(image, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// One stage, one stump: accepts windows whose bottom half is brighter
    /// than the top half.
    const BRIGHT_BOTTOM_XML: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier"><stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>4</height>
  <width>4</width>
  <stageParams>
    <maxWeakCount>1</maxWeakCount></stageParams>
  <featureParams>
    <maxCatCount>0</maxCatCount></featureParams>
  <stageNum>1</stageNum>
  <stages>
    <!-- stage 0 -->
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 5.0000000000000000e-01</internalNodes>
          <leafValues>
            -1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          0 0 4 2 -1.</_>
        <_>
          0 2 4 2 1.</_></rects>
      <tilted>0</tilted></_></features></cascade>
</opencv_storage>
"#;

    fn half_and_half(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |_, y| Luma([if y < height / 2 { 0 } else { 255 }]))
    }

    fn region(x: u32, y: u32, width: u32, height: u32) -> Region {
        Region {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_parse_cascade() {
        let cascade = HaarCascade::from_xml(BRIGHT_BOTTOM_XML).unwrap();
        assert_eq!(cascade.window(), (4, 4));
        assert_eq!(cascade.stages.len(), 1);
        assert_eq!(cascade.features[0].rects.len(), 2);
        assert_eq!(cascade.features[0].rects[0].weight, -1.0);
    }

    #[test]
    fn test_two_stage_cascade_from_file() {
        let path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/cascades/lit_window_face.xml"
        );
        let cascade = HaarCascade::from_file(path).unwrap();
        assert_eq!(cascade.window(), (8, 8));
        assert_eq!(cascade.stages.len(), 2);

        // Every window passes both stages; the pyramid hits collapse into one
        let lit = GrayImage::from_pixel(32, 32, Luma([40]));
        let found = cascade.detect_multi_scale(&lit, DetectParams::FACE).unwrap();
        assert_eq!(found, vec![region(10, 10, 13, 13)]);

        // Passes the first stage, rejected by the second
        let blown_out = GrayImage::from_pixel(8, 8, Luma([255]));
        let params = DetectParams {
            scale_factor: 1.1,
            min_neighbors: 0,
        };
        assert!(cascade.detect_multi_scale(&blown_out, params).unwrap().is_empty());
    }

    #[test]
    fn test_reject_tilted_and_unknown_feature_type() {
        let tilted = BRIGHT_BOTTOM_XML.replace("<tilted>0</tilted>", "<tilted>1</tilted>");
        assert!(matches!(
            HaarCascade::from_xml(&tilted),
            Err(DetectorError::Unsupported(_))
        ));

        let lbp = BRIGHT_BOTTOM_XML.replace("<featureType>HAAR", "<featureType>LBP");
        assert!(matches!(
            HaarCascade::from_xml(&lbp),
            Err(DetectorError::Unsupported(_))
        ));
    }

    #[test]
    fn test_reject_dangling_leaf() {
        let broken = BRIGHT_BOTTOM_XML.replace("0 -1 0 5.", "0 -3 0 5.");
        assert!(matches!(
            HaarCascade::from_xml(&broken),
            Err(DetectorError::Parse(_))
        ));
    }

    #[test]
    fn test_reject_garbage_and_missing_file() {
        assert!(HaarCascade::from_xml("<opencv_storage/>").is_err());
        assert!(matches!(
            HaarCascade::from_file("/nonexistent/cascade.xml"),
            Err(DetectorError::Io { .. })
        ));
    }

    #[test]
    fn test_detects_matching_window() {
        let cascade = HaarCascade::from_xml(BRIGHT_BOTTOM_XML).unwrap();
        let params = DetectParams {
            scale_factor: 1.1,
            min_neighbors: 1,
        };

        // Factors 1.0 and 1.1 both round back to a 4x4 scan, giving two
        // identical raw hits that merge into one region.
        let found = cascade.detect_multi_scale(&half_and_half(4, 4), params).unwrap();
        assert_eq!(found, vec![region(0, 0, 4, 4)]);
    }

    #[test]
    fn test_non_matching_windows_are_rejected() {
        let cascade = HaarCascade::from_xml(BRIGHT_BOTTOM_XML).unwrap();
        let params = DetectParams {
            scale_factor: 1.2,
            min_neighbors: 0,
        };

        let flat = GrayImage::from_pixel(4, 4, Luma([128]));
        assert!(cascade.detect_multi_scale(&flat, params).unwrap().is_empty());

        let upside_down = GrayImage::from_fn(4, 4, |_, y| Luma([if y < 2 { 255 } else { 0 }]));
        assert!(cascade.detect_multi_scale(&upside_down, params).unwrap().is_empty());
    }

    #[test]
    fn test_image_smaller_than_window() {
        let cascade = HaarCascade::from_xml(BRIGHT_BOTTOM_XML).unwrap();
        let found = cascade
            .detect_multi_scale(&half_and_half(3, 3), DetectParams::FACE)
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_scale_factor_must_grow() {
        let cascade = HaarCascade::from_xml(BRIGHT_BOTTOM_XML).unwrap();
        let params = DetectParams {
            scale_factor: 1.0,
            min_neighbors: 1,
        };
        assert!(matches!(
            cascade.detect_multi_scale(&half_and_half(4, 4), params),
            Err(DetectorError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_group_merges_and_averages_neighbours() {
        let rects = vec![
            region(10, 10, 40, 40),
            region(12, 10, 40, 40),
            region(11, 12, 42, 42),
            region(200, 200, 30, 30),
        ];
        let grouped = group_rectangles(rects, 2, GROUP_EPS);
        assert_eq!(grouped, vec![region(11, 11, 41, 41)]);
    }

    #[test]
    fn test_group_threshold_zero_is_passthrough() {
        let rects = vec![region(0, 0, 10, 10), region(1, 1, 10, 10)];
        assert_eq!(group_rectangles(rects.clone(), 0, GROUP_EPS), rects);
    }

    #[test]
    fn test_group_drops_small_cluster_inside_strong_one() {
        let mut rects = vec![region(100, 100, 10, 10); 2];
        rects.extend(vec![region(90, 90, 40, 40); 6]);
        let grouped = group_rectangles(rects, 1, GROUP_EPS);
        assert_eq!(grouped, vec![region(90, 90, 40, 40)]);
    }

    #[test]
    fn test_detector_trait_uses_bound_params() {
        let detector = CascadeDetector::new(
            HaarCascade::from_xml(BRIGHT_BOTTOM_XML).unwrap(),
            DetectParams {
                scale_factor: 1.1,
                min_neighbors: 1,
            },
        );
        assert_eq!(detector.detect(&half_and_half(4, 4)).unwrap().len(), 1);
    }
}
