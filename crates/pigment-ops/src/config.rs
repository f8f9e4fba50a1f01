//! Filter configuration as a string-keyed property bag.
//!
//! Filters receive their parameters as a [`PropertyBag`]: a map from keys to
//! loosely typed values with getters that take the caller's default. Typed
//! views ([`InpaintConfig`], [`ConvolutionConfig`]) read the keys they know
//! and validate them.
//!
//! Bags serialize to YAML:
//!
//! ```yaml
//! radius: 6
//! accuracy: 80
//! engine: fft
//! ```
//!
//! # Example
//!
//! ```rust
//! use pigment_ops::config::{InpaintConfig, PropertyBag};
//!
//! let bag = PropertyBag::from_yaml("radius: 6\naccuracy: 80\n").unwrap();
//! let config = InpaintConfig::from_bag(&bag).unwrap();
//! assert_eq!(config.radius, 6);
//! assert_eq!(config.accuracy, 80);
//! ```

use crate::convolution::ConvolutionEngine;
use crate::device::EdgePolicy;
use crate::{OpsError, OpsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Property bag
// ============================================================================

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Double(f64),
    /// Free text.
    String(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
        }
    }
}

/// String-keyed map of typed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag {
    values: BTreeMap<String, PropertyValue>,
}

impl PropertyBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a YAML mapping.
    pub fn from_yaml(yaml: &str) -> OpsResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serializes the bag to YAML.
    pub fn to_yaml(&self) -> OpsResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    /// Returns `true` if `key` is set.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.values.remove(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Value of `key` as text, or `default`.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key)
            .map(|v| v.to_string())
            .unwrap_or_else(|| default.to_string())
    }

    /// Value of `key` as a flag, or `default` if absent or not a flag.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(PropertyValue::Bool(v)) => *v,
            Some(PropertyValue::Int(v)) => *v != 0,
            Some(PropertyValue::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" => false,
                _ => default,
            },
            _ => default,
        }
    }

    /// Value of `key` as an integer, or `default` if absent or not numeric.
    ///
    /// Doubles are rounded to the nearest integer.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(PropertyValue::Int(v)) => *v,
            Some(PropertyValue::Double(v)) if v.is_finite() => v.round() as i64,
            Some(PropertyValue::String(s)) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.round() as i64))
                    .unwrap_or(default)
            }
            _ => default,
        }
    }

    /// Value of `key` as a double, or `default` if absent or not numeric.
    pub fn get_double(&self, key: &str, default: f64) -> f64 {
        match self.get(key) {
            Some(PropertyValue::Double(v)) => *v,
            Some(PropertyValue::Int(v)) => *v as f64,
            Some(PropertyValue::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    /// Sets a text value.
    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(key.into(), PropertyValue::String(value.into()));
    }

    /// Sets a flag.
    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.values.insert(key.into(), PropertyValue::Bool(value));
    }

    /// Sets an integer.
    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.values.insert(key.into(), PropertyValue::Int(value));
    }

    /// Sets a double.
    pub fn set_double(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), PropertyValue::Double(value));
    }
}

// ============================================================================
// Inpainting
// ============================================================================

/// Parameters of [`patch_image`](crate::inpaint::patch_image).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InpaintConfig {
    /// Patch radius in pixels, key `"radius"`.
    pub radius: i32,
    /// Context size around the mask, 0..=100, key `"accuracy"`.
    pub accuracy: i32,
    /// Seed of the random search, key `"seed"`.
    pub seed: u64,
}

impl InpaintConfig {
    /// Default patch radius.
    pub const DEFAULT_RADIUS: i32 = 4;
    /// Default accuracy.
    pub const DEFAULT_ACCURACY: i32 = 50;

    /// Reads the configuration, applying defaults for missing keys.
    pub fn from_bag(bag: &PropertyBag) -> OpsResult<Self> {
        let config = Self {
            radius: bag.get_int("radius", Self::DEFAULT_RADIUS as i64) as i32,
            accuracy: bag.get_int("accuracy", Self::DEFAULT_ACCURACY as i64) as i32,
            seed: bag.get_int("seed", 0) as u64,
        };
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration into a bag.
    pub fn to_bag(&self) -> PropertyBag {
        let mut bag = PropertyBag::new();
        bag.set_int("radius", self.radius as i64);
        bag.set_int("accuracy", self.accuracy as i64);
        bag.set_int("seed", self.seed as i64);
        bag
    }

    /// Checks the parameter ranges.
    pub fn validate(&self) -> OpsResult<()> {
        if self.radius < 1 {
            return Err(OpsError::InvalidParameter(format!(
                "inpaint radius must be >= 1, got {}",
                self.radius
            )));
        }
        if !(0..=100).contains(&self.accuracy) {
            return Err(OpsError::InvalidParameter(format!(
                "inpaint accuracy must be in 0..=100, got {}",
                self.accuracy
            )));
        }
        Ok(())
    }
}

impl Default for InpaintConfig {
    fn default() -> Self {
        Self {
            radius: Self::DEFAULT_RADIUS,
            accuracy: Self::DEFAULT_ACCURACY,
            seed: 0,
        }
    }
}

// ============================================================================
// Convolution
// ============================================================================

/// Overrides and worker selection for
/// [`ConvolutionPainter`](crate::convolution::ConvolutionPainter).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConvolutionConfig {
    /// Replaces the kernel factor, key `"factor"`.
    pub factor: Option<f64>,
    /// Replaces the kernel offset, key `"offset"`.
    pub offset: Option<f64>,
    /// Worker selection, key `"engine"`: `auto`, `spatial` or `fft`.
    pub engine: ConvolutionEngine,
    /// Border handling, key `"edge"`: `standard` or `repeat`.
    pub edge: EdgePolicy,
}

impl ConvolutionConfig {
    /// Reads the configuration. Unknown engine or edge names are errors.
    pub fn from_bag(bag: &PropertyBag) -> OpsResult<Self> {
        let engine = match bag.get_string("engine", "auto").to_ascii_lowercase().as_str() {
            "auto" => ConvolutionEngine::Auto,
            "spatial" => ConvolutionEngine::Spatial,
            "fft" => ConvolutionEngine::Fft,
            other => {
                return Err(OpsError::InvalidParameter(format!(
                    "unknown convolution engine '{}'",
                    other
                )));
            }
        };
        let edge = match bag.get_string("edge", "standard").to_ascii_lowercase().as_str() {
            "standard" => EdgePolicy::Standard,
            "repeat" => EdgePolicy::Repeat,
            other => {
                return Err(OpsError::InvalidParameter(format!(
                    "unknown edge policy '{}'",
                    other
                )));
            }
        };
        let number = |key: &str| bag.contains(key).then(|| bag.get_double(key, 0.0));
        Ok(Self {
            factor: number("factor"),
            offset: number("offset"),
            engine,
            edge,
        })
    }

    /// Writes the configuration into a bag.
    pub fn to_bag(&self) -> PropertyBag {
        let mut bag = PropertyBag::new();
        if let Some(factor) = self.factor {
            bag.set_double("factor", factor);
        }
        if let Some(offset) = self.offset {
            bag.set_double("offset", offset);
        }
        let engine = match self.engine {
            ConvolutionEngine::Auto => "auto",
            ConvolutionEngine::Spatial => "spatial",
            ConvolutionEngine::Fft => "fft",
        };
        bag.set_string("engine", engine);
        let edge = match self.edge {
            EdgePolicy::Standard => "standard",
            EdgePolicy::Repeat => "repeat",
        };
        bag.set_string("edge", edge);
        bag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_getters_with_defaults() {
        let mut bag = PropertyBag::new();
        bag.set_int("radius", 7);
        bag.set_double("factor", 2.5);
        bag.set_string("flag", "yes");

        assert_eq!(bag.get_int("radius", 0), 7);
        assert_eq!(bag.get_int("missing", 3), 3);
        assert_eq!(bag.get_double("radius", 0.0), 7.0);
        assert_eq!(bag.get_int("factor", 0), 3);
        assert!(bag.get_bool("flag", false));
        assert!(!bag.get_bool("missing", false));
        assert_eq!(bag.get_string("radius", ""), "7");
        assert_eq!(bag.get_string("missing", "x"), "x");
    }

    #[test]
    fn test_string_coercion() {
        let mut bag = PropertyBag::new();
        bag.set_string("n", " 12 ");
        bag.set_string("d", "0.25");
        bag.set_string("bad", "abc");
        assert_eq!(bag.get_int("n", 0), 12);
        assert_eq!(bag.get_double("d", 0.0), 0.25);
        assert_eq!(bag.get_int("bad", -1), -1);
        assert!(bag.get_bool("bad", true));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut bag = PropertyBag::new();
        bag.set_int("radius", 5);
        bag.set_double("offset", 0.5);
        bag.set_bool("enabled", true);
        bag.set_string("engine", "fft");

        let yaml = bag.to_yaml().unwrap();
        let back = PropertyBag::from_yaml(&yaml).unwrap();
        assert_eq!(back, bag);
    }

    #[test]
    fn test_yaml_typed_values() {
        let bag = PropertyBag::from_yaml("a: 3\nb: 0.5\nc: true\nd: text\n").unwrap();
        assert_eq!(bag.get("a"), Some(&PropertyValue::Int(3)));
        assert_eq!(bag.get("b"), Some(&PropertyValue::Double(0.5)));
        assert_eq!(bag.get("c"), Some(&PropertyValue::Bool(true)));
        assert_eq!(bag.get("d"), Some(&PropertyValue::String("text".into())));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            PropertyBag::from_yaml("- not\n- a map\n"),
            Err(OpsError::Config(_))
        ));
    }

    #[test]
    fn test_inpaint_defaults() {
        let config = InpaintConfig::from_bag(&PropertyBag::new()).unwrap();
        assert_eq!(config, InpaintConfig::default());
        assert_eq!(config.radius, 4);
        assert_eq!(config.accuracy, 50);
    }

    #[test]
    fn test_inpaint_validation() {
        let mut bag = PropertyBag::new();
        bag.set_int("radius", 0);
        assert!(InpaintConfig::from_bag(&bag).is_err());

        bag.set_int("radius", 2);
        bag.set_int("accuracy", 150);
        assert!(InpaintConfig::from_bag(&bag).is_err());
    }

    #[test]
    fn test_inpaint_to_bag() {
        let config = InpaintConfig {
            radius: 3,
            accuracy: 10,
            seed: 99,
        };
        assert_eq!(InpaintConfig::from_bag(&config.to_bag()).unwrap(), config);
    }

    #[test]
    fn test_convolution_config() {
        let bag = PropertyBag::from_yaml("factor: 9\nengine: FFT\nedge: repeat\n").unwrap();
        let config = ConvolutionConfig::from_bag(&bag).unwrap();
        assert_eq!(config.factor, Some(9.0));
        assert_eq!(config.offset, None);
        assert_eq!(config.engine, ConvolutionEngine::Fft);
        assert_eq!(config.edge, EdgePolicy::Repeat);
        assert_eq!(ConvolutionConfig::from_bag(&config.to_bag()).unwrap(), config);
    }

    #[test]
    fn test_convolution_config_unknown_engine() {
        let bag = PropertyBag::from_yaml("engine: gpu\n").unwrap();
        assert!(matches!(
            ConvolutionConfig::from_bag(&bag),
            Err(OpsError::InvalidParameter(_))
        ));
    }
}
