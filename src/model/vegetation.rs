use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Number of VPRM vegetation classes
pub const NUM_CLASSES: usize = 8;

#[derive(Error, Debug)]
pub enum ParameterError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown vegetation class index: {0}")]
    UnknownClass(usize),

    #[error("Vegetation class {0} is defined more than once")]
    DuplicateClass(usize),

    #[error("Parameters missing for vegetation class {0}")]
    MissingClass(usize),
}

/// The eight VPRM vegetation classes, in parameter-table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VegetationClass {
    Evergreen,
    Deciduous,
    MixedForest,
    Shrubland,
    Savanna,
    Cropland,
    Grassland,
    Others,
}

impl VegetationClass {
    pub const ALL: [VegetationClass; NUM_CLASSES] = [
        VegetationClass::Evergreen,
        VegetationClass::Deciduous,
        VegetationClass::MixedForest,
        VegetationClass::Shrubland,
        VegetationClass::Savanna,
        VegetationClass::Cropland,
        VegetationClass::Grassland,
        VegetationClass::Others,
    ];

    /// 0-based row in the parameter table
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Map an IGBP land-cover code. Codes without a VPRM counterpart
    /// (wetlands, urban, snow, ...) return `None`.
    pub fn from_igbp(code: &str) -> Option<Self> {
        match code.trim() {
            "ENF" | "EBF" => Some(Self::Evergreen),
            "DNF" | "DBF" => Some(Self::Deciduous),
            "MF" => Some(Self::MixedForest),
            "CSH" | "OSH" => Some(Self::Shrubland),
            "WS" | "SAV" => Some(Self::Savanna),
            "CRO" => Some(Self::Cropland),
            "GRA" => Some(Self::Grassland),
            _ => None,
        }
    }

    pub fn is_evergreen(self) -> bool {
        matches!(self, Self::Evergreen)
    }

    /// Xeric classes scale water stress over the absolute LSWI range
    pub fn is_xeric(self) -> bool {
        matches!(self, Self::Shrubland | Self::Grassland)
    }

    /// Classes whose phenology scalar saturates once EVI passes the
    /// green-up threshold. Savanna and grassland never do.
    pub fn phenology_uses_evi_threshold(self) -> bool {
        matches!(
            self,
            Self::Deciduous | Self::MixedForest | Self::Shrubland | Self::Cropland | Self::Others
        )
    }
}

impl fmt::Display for VegetationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Evergreen => "Evergreen Forest",
            Self::Deciduous => "Deciduous Forest",
            Self::MixedForest => "Mixed Forest",
            Self::Shrubland => "Shrubland",
            Self::Savanna => "Savannas",
            Self::Cropland => "Cropland",
            Self::Grassland => "Grassland",
            Self::Others => "Others",
        };
        write!(f, "{}", name)
    }
}

/// Physiological constants of one vegetation class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassParameters {
    /// Minimum photosynthesis temperature (°C)
    pub temp_min: f64,
    /// Optimal photosynthesis temperature (°C)
    pub temp_opt: f64,
    /// Maximum photosynthesis temperature (°C)
    pub temp_max: f64,
    /// Light-use efficiency for shortwave radiation
    pub lambda_gpp: f64,
    /// Half-saturation shortwave radiation (W/m²)
    pub rad_zero: f64,
    /// Respiration slope against temperature
    pub alpha_resp: f64,
    /// Respiration intercept
    pub int_resp: f64,
}

#[derive(Debug, Deserialize)]
struct ParameterRow {
    class: usize,
    #[serde(rename = "tempMin")]
    temp_min: f64,
    #[serde(rename = "tempOpt")]
    temp_opt: f64,
    #[serde(rename = "tempMax")]
    temp_max: f64,
    #[serde(rename = "lambdaGPP.sw")]
    lambda_gpp: f64,
    #[serde(rename = "swradZero")]
    rad_zero: f64,
    #[serde(rename = "alphaResp")]
    alpha_resp: f64,
    #[serde(rename = "intResp")]
    int_resp: f64,
}

impl From<&ParameterRow> for ClassParameters {
    fn from(row: &ParameterRow) -> Self {
        Self {
            temp_min: row.temp_min,
            temp_opt: row.temp_opt,
            temp_max: row.temp_max,
            lambda_gpp: row.lambda_gpp,
            rad_zero: row.rad_zero,
            alpha_resp: row.alpha_resp,
            int_resp: row.int_resp,
        }
    }
}

/// Parameter table for all eight classes, shared read-only by every station
#[derive(Debug, Clone, PartialEq)]
pub struct VprmParameters {
    classes: [ClassParameters; NUM_CLASSES],
}

impl VprmParameters {
    pub fn new(classes: [ClassParameters; NUM_CLASSES]) -> Self {
        Self { classes }
    }

    /// Same parameters for every class
    pub fn uniform(parameters: ClassParameters) -> Self {
        Self::new([parameters; NUM_CLASSES])
    }

    pub fn get(&self, class: VegetationClass) -> &ClassParameters {
        &self.classes[class.index()]
    }

    /// Read the table from CSV with header
    /// `class,tempMin,tempOpt,tempMax,lambdaGPP.sw,swradZero,alphaResp,intResp`
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, ParameterError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self, ParameterError> {
        let mut slots: [Option<ClassParameters>; NUM_CLASSES] = [None; NUM_CLASSES];

        for row in reader.deserialize() {
            let row: ParameterRow = row?;
            let slot = slots
                .get_mut(row.class)
                .ok_or(ParameterError::UnknownClass(row.class))?;
            if slot.is_some() {
                return Err(ParameterError::DuplicateClass(row.class));
            }
            *slot = Some(ClassParameters::from(&row));
        }

        let mut classes = Vec::with_capacity(NUM_CLASSES);
        for (index, slot) in slots.into_iter().enumerate() {
            classes.push(slot.ok_or(ParameterError::MissingClass(index))?);
        }
        let classes: [ClassParameters; NUM_CLASSES] = classes
            .try_into()
            .map_err(|_| ParameterError::MissingClass(NUM_CLASSES - 1))?;
        Ok(Self::new(classes))
    }
}
