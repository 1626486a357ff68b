use crate::models::{
    AdditionalDatum, ClinicalRecordError, CreateClinicalRecordRequest, Measurements, MAX_ADDITIONAL_DATA,
};

/// Checks ranges and normalizes the request. At least one vital sign is
/// required; blood pressure is kept only when both readings are present;
/// blank additional entries are dropped and the rest capped.
pub fn validate_measurements(request: &CreateClinicalRecordRequest) -> Result<Measurements, ClinicalRecordError> {
    if request.height_cm.is_none()
        && request.weight_kg.is_none()
        && request.temperature_c.is_none()
        && request.systolic.is_none()
    {
        return Err(ClinicalRecordError::Validation(
            "At least one of height, weight, temperature or blood pressure is required".to_string(),
        ));
    }

    check_range(request.height_cm, "Height", |h| h > 0.0 && h <= 300.0, "between 0 and 300 cm")?;
    check_range(request.weight_kg, "Weight", |w| w > 0.0 && w <= 500.0, "between 0 and 500 kg")?;
    check_range(request.temperature_c, "Temperature", |t| (30.0..=45.0).contains(&t), "between 30 and 45 °C")?;
    check_range(request.systolic, "Systolic pressure", |s| s > 0.0 && s <= 300.0, "between 0 and 300")?;
    check_range(request.diastolic, "Diastolic pressure", |d| d > 0.0 && d <= 200.0, "between 0 and 200")?;

    let blood_pressure = match (request.systolic, request.diastolic) {
        (Some(systolic), Some(diastolic)) => Some(format!("{}/{}", systolic, diastolic)),
        _ => None,
    };

    let additional_data: Vec<AdditionalDatum> = request
        .additional_data
        .iter()
        .filter_map(|datum| {
            let key = datum.key.trim();
            let value = datum.value.trim();
            if key.is_empty() || value.is_empty() {
                None
            } else {
                Some(AdditionalDatum { key: key.to_string(), value: value.to_string() })
            }
        })
        .take(MAX_ADDITIONAL_DATA)
        .collect();

    Ok(Measurements {
        height_cm: request.height_cm,
        weight_kg: request.weight_kg,
        temperature_c: request.temperature_c,
        blood_pressure,
        additional_data,
    })
}

fn check_range(
    value: Option<f64>,
    label: &str,
    valid: impl Fn(f64) -> bool,
    expected: &str,
) -> Result<(), ClinicalRecordError> {
    match value {
        Some(v) if !v.is_finite() || !valid(v) => Err(ClinicalRecordError::Validation(format!(
            "{} must be {}",
            label, expected
        ))),
        _ => Ok(()),
    }
}
