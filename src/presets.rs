// Processing presets and their mapping onto NodeODM task options.
//
// `ProcessingOptions` is what the user edits; `to_task_options` turns it
// into the `[{name, value}]` list NodeODM accepts on `/task/new`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    High,
    Medium,
    Low,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::High, Quality::Medium, Quality::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::High => "high",
            Quality::Medium => "medium",
            Quality::Low => "low",
        }
    }
}

/// Feature extraction level; `Auto` is sent to NodeODM as `high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureQuality {
    Auto,
    High,
    Medium,
    Low,
}

impl FeatureQuality {
    pub const ALL: [FeatureQuality; 4] = [
        FeatureQuality::Auto,
        FeatureQuality::High,
        FeatureQuality::Medium,
        FeatureQuality::Low,
    ];

    fn task_value(self) -> &'static str {
        match self {
            FeatureQuality::Auto | FeatureQuality::High => "high",
            FeatureQuality::Medium => "medium",
            FeatureQuality::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraLens {
    Auto,
    Perspective,
    Fisheye,
    Spherical,
}

impl CameraLens {
    pub const ALL: [CameraLens; 4] = [
        CameraLens::Auto,
        CameraLens::Perspective,
        CameraLens::Fisheye,
        CameraLens::Spherical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CameraLens::Auto => "auto",
            CameraLens::Perspective => "perspective",
            CameraLens::Fisheye => "fisheye",
            CameraLens::Spherical => "spherical",
        }
    }
}

/// User-facing processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    pub feature_extraction: FeatureQuality,
    pub camera_lens: CameraLens,
    pub dsm: bool,
    pub dtm: bool,
    pub orthophoto: bool,
    pub reconstruction: Quality,
    /// Camera field of view in degrees.
    pub fov: u32,
    pub pointcloud_density: Quality,
    pub outlier_removal: bool,
    /// Point cloud filter standard deviation.
    pub deviation: u32,
    /// Orthophoto resolution in cm/pixel.
    pub resolution: u32,
    pub tile_size: u32,
    pub texture_mesh: bool,
    pub generate_report: bool,
    /// 0 lets NodeODM pick.
    pub threads: u32,
    /// GB, 0 for no limit.
    pub memory_limit: u32,
}

impl Default for ProcessingOptions {
    /// Same values as [`Preset::Default`].
    fn default() -> Self {
        Self {
            feature_extraction: FeatureQuality::Medium,
            camera_lens: CameraLens::Auto,
            dsm: true,
            dtm: false,
            orthophoto: true,
            reconstruction: Quality::High,
            fov: 60,
            pointcloud_density: Quality::Medium,
            outlier_removal: false,
            deviation: 5,
            resolution: 24,
            tile_size: 2048,
            texture_mesh: true,
            generate_report: true,
            threads: 0,
            memory_limit: 8,
        }
    }
}

/// One entry of the NodeODM `options` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOption {
    pub name: String,
    pub value: Value,
}

impl TaskOption {
    fn new(name: &str, value: Value) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

impl ProcessingOptions {
    pub fn to_task_options(&self) -> Vec<TaskOption> {
        let mut out = Vec::new();
        if self.dsm {
            out.push(TaskOption::new("dsm", json!(true)));
        }
        if self.dtm {
            out.push(TaskOption::new("dtm", json!(true)));
        }
        if self.orthophoto {
            out.push(TaskOption::new(
                "orthophoto-resolution",
                json!(self.resolution.to_string()),
            ));
        }
        out.push(TaskOption::new(
            "reconstruction-quality",
            json!(self.reconstruction.as_str()),
        ));
        out.push(TaskOption::new("camera-lens", json!(self.camera_lens.as_str())));
        out.push(TaskOption::new(
            "point-cloud-quality",
            json!(self.pointcloud_density.as_str()),
        ));
        out.push(TaskOption::new("camera-fov", json!(self.fov.to_string())));
        if self.outlier_removal {
            out.push(TaskOption::new("use-3dmesh", json!(true)));
            out.push(TaskOption::new("pc-cleanup", json!(true)));
            out.push(TaskOption::new("pc-classify", json!(true)));
            out.push(TaskOption::new("pc-filter", json!(self.deviation.to_string())));
        }
        out.push(TaskOption::new("mesh-size", json!(self.tile_size.to_string())));
        if self.texture_mesh {
            out.push(TaskOption::new("textured-mesh", json!(true)));
        }
        if self.generate_report {
            out.push(TaskOption::new("build-overviews", json!(true)));
        }
        if self.threads > 0 {
            out.push(TaskOption::new("threads", json!(self.threads.to_string())));
        }
        if self.memory_limit > 0 {
            out.push(TaskOption::new("max-memory", json!(self.memory_limit.to_string())));
        }
        out.push(TaskOption::new(
            "feature-quality",
            json!(self.feature_extraction.task_value()),
        ));
        out
    }
}

/// Named configurations matching the WebODM presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    Default,
    #[serde(rename = "High Resolution")]
    HighResolution,
    #[serde(rename = "Fast Orthophoto")]
    FastOrthophoto,
    Field,
    #[serde(rename = "DSM+DTM")]
    DsmDtm,
    #[serde(rename = "3D Model")]
    Model3d,
    /// Leaves the current options untouched.
    Custom,
}

impl Preset {
    pub const ALL: [Preset; 7] = [
        Preset::Default,
        Preset::HighResolution,
        Preset::FastOrthophoto,
        Preset::Field,
        Preset::DsmDtm,
        Preset::Model3d,
        Preset::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Default => "Default",
            Preset::HighResolution => "High Resolution",
            Preset::FastOrthophoto => "Fast Orthophoto",
            Preset::Field => "Field",
            Preset::DsmDtm => "DSM+DTM",
            Preset::Model3d => "3D Model",
            Preset::Custom => "Custom",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// The settings this preset stands for; `None` for [`Preset::Custom`].
    pub fn options(self) -> Option<ProcessingOptions> {
        let base = ProcessingOptions::default();
        let options = match self {
            Preset::Default => base,
            Preset::HighResolution => ProcessingOptions {
                feature_extraction: FeatureQuality::High,
                dtm: true,
                pointcloud_density: Quality::High,
                resolution: 12,
                ..base
            },
            Preset::FastOrthophoto => ProcessingOptions {
                feature_extraction: FeatureQuality::Low,
                dsm: false,
                reconstruction: Quality::Medium,
                pointcloud_density: Quality::Low,
                resolution: 48,
                tile_size: 4096,
                texture_mesh: false,
                generate_report: false,
                ..base
            },
            Preset::Field => ProcessingOptions {
                feature_extraction: FeatureQuality::High,
                camera_lens: CameraLens::Perspective,
                resolution: 16,
                texture_mesh: false,
                ..base
            },
            Preset::DsmDtm => ProcessingOptions {
                dtm: true,
                outlier_removal: true,
                deviation: 3,
                ..base
            },
            Preset::Model3d => ProcessingOptions {
                feature_extraction: FeatureQuality::High,
                pointcloud_density: Quality::High,
                resolution: 16,
                memory_limit: 12,
                ..base
            },
            Preset::Custom => return None,
        };
        Some(options)
    }

    /// Apply the preset to `options`. Custom is a no-op.
    pub fn apply(self, options: &mut ProcessingOptions) {
        if let Some(preset) = self.options() {
            *options = preset;
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(options: &[TaskOption]) -> Vec<&str> {
        options.iter().map(|o| o.name.as_str()).collect()
    }

    fn value<'a>(options: &'a [TaskOption], name: &str) -> Option<&'a Value> {
        options.iter().find(|o| o.name == name).map(|o| &o.value)
    }

    #[test]
    fn default_preset_maps_to_expected_task_options() {
        let opts = ProcessingOptions::default().to_task_options();
        assert_eq!(
            names(&opts),
            vec![
                "dsm",
                "orthophoto-resolution",
                "reconstruction-quality",
                "camera-lens",
                "point-cloud-quality",
                "camera-fov",
                "mesh-size",
                "textured-mesh",
                "build-overviews",
                "max-memory",
                "feature-quality",
            ]
        );
        assert_eq!(value(&opts, "orthophoto-resolution"), Some(&json!("24")));
        assert_eq!(value(&opts, "feature-quality"), Some(&json!("medium")));
        assert_eq!(value(&opts, "max-memory"), Some(&json!("8")));
    }

    #[test]
    fn outlier_removal_enables_filtering_options() {
        let opts = Preset::DsmDtm.options().unwrap().to_task_options();
        assert_eq!(value(&opts, "dtm"), Some(&json!(true)));
        assert_eq!(value(&opts, "pc-cleanup"), Some(&json!(true)));
        assert_eq!(value(&opts, "pc-filter"), Some(&json!("3")));
    }

    #[test]
    fn auto_feature_quality_is_sent_as_high() {
        let options = ProcessingOptions {
            feature_extraction: FeatureQuality::Auto,
            threads: 4,
            ..ProcessingOptions::default()
        };
        let opts = options.to_task_options();
        assert_eq!(value(&opts, "feature-quality"), Some(&json!("high")));
        assert_eq!(value(&opts, "threads"), Some(&json!("4")));
    }

    #[test]
    fn preset_table_values() {
        let fast = Preset::FastOrthophoto.options().unwrap();
        assert!(!fast.dsm);
        assert_eq!(fast.tile_size, 4096);
        assert_eq!(fast.resolution, 48);

        let field = Preset::Field.options().unwrap();
        assert_eq!(field.camera_lens, CameraLens::Perspective);

        let model = Preset::Model3d.options().unwrap();
        assert_eq!(model.memory_limit, 12);
    }

    #[test]
    fn custom_keeps_current_options() {
        let mut options = Preset::HighResolution.options().unwrap();
        let before = options.clone();
        Preset::Custom.apply(&mut options);
        assert_eq!(options, before);
        Preset::Default.apply(&mut options);
        assert_eq!(options, ProcessingOptions::default());
    }

    #[test]
    fn preset_names_round_trip() {
        for preset in Preset::ALL {
            assert_eq!(Preset::from_name(preset.name()), Some(preset));
            let encoded = serde_json::to_string(&preset).unwrap();
            assert_eq!(encoded, format!("\"{}\"", preset.name()));
        }
        assert_eq!(Preset::from_name("bogus"), None);
    }
}
