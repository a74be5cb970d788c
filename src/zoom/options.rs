use super::controller::ZoomController;
use crate::query::{Resolution, ResolutionSetting};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesOptions {
    pub field: String,
    pub label: String,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisScale {
    pub min: u64,
    pub max: u64,
}

/// Render options for one chart frame. Built fresh from controller state
/// each time; nothing holds on to or mutates a previous value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    pub title: String,
    pub series: Vec<SeriesOptions>,
    pub setting: ResolutionSetting,
    pub resolution: Option<Resolution>,
    /// Forced x-axis range while zoomed; `None` lets the axis autoscale.
    pub x_scale: Option<AxisScale>,
}

impl ChartOptions {
    pub(crate) fn build(title: &str, controller: &ZoomController) -> Self {
        let target = controller.target();
        let series = controller
            .buffer()
            .fields()
            .iter()
            .map(|field| {
                let unit = target
                    .fields
                    .iter()
                    .find(|spec| &spec.name == field)
                    .and_then(|spec| spec.unit.clone());
                let label = match &unit {
                    Some(unit) => format!("{} ({})", field, unit),
                    None => field.clone(),
                };
                SeriesOptions {
                    field: field.clone(),
                    label,
                    unit,
                }
            })
            .collect();

        Self {
            title: title.to_string(),
            series,
            setting: controller.setting(),
            resolution: controller.resolution(),
            x_scale: controller
                .axis_scale()
                .map(|(min, max)| AxisScale { min, max }),
        }
    }
}
