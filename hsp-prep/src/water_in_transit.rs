//! Water in transit: upstream discharge that reaches a reservoir as inflow
//! after a distribution of travel times.
//!
//! The delay shape lives on the releasing gate or plant in the model tree,
//! either as a `shape_discharge` curve (x = delay in minutes, y = fraction of
//! the discharge arriving after that delay) or as a single `time_delay` in
//! minutes meaning everything arrives at once.

use crate::error::{PrepError, Result};
use crate::transform::{offset_by, TransformContext, TransitSource, MAX_OFFSET_MINUTES};
use chrono::{Duration, NaiveDateTime};
use hsp_model::{AttributeValue, ModelTree};
use hsp_series::time::{floor_hour, hourly_grid};
use hsp_series::{Datapoints, Series};
use hsp_store::merge;
use log::{debug, warn};

/// `(delay in minutes, fraction)` pairs.
pub type DischargeShape = Vec<(i64, f64)>;

/// Delay shape of the gate or plant named by `source`.
pub fn discharge_shape(model: &ModelTree, source: &TransitSource) -> Result<DischargeShape> {
    let missing = || PrepError::MissingShape {
        object_type: source.object_type.clone(),
        object_name: source.object_name.clone(),
    };
    let attributes = model
        .object(&source.object_type, &source.object_name)
        .ok_or_else(missing)?;

    let shape = match (attributes.get("shape_discharge"), attributes.get("time_delay")) {
        (Some(AttributeValue::Curve(curve)), _) => {
            curve.validate()?;
            curve
                .points()
                .map(|(delay, fraction)| Ok((delay_minutes(source, delay)?, fraction)))
                .collect::<Result<DischargeShape>>()?
        }
        (_, Some(delay)) => match delay.as_scalar() {
            Some(delay) => vec![(delay_minutes(source, delay)?, 1.0)],
            None => return Err(missing()),
        },
        _ => return Err(missing()),
    };
    Ok(shape)
}

fn delay_minutes(source: &TransitSource, delay: f64) -> Result<i64> {
    if !(0.0..=MAX_OFFSET_MINUTES as f64).contains(&delay) {
        return Err(PrepError::InvalidParameter {
            transformation: "ADD_WATER_IN_TRANSIT".to_string(),
            parameter: format!("{} '{}' delay", source.object_type, source.object_name),
            reason: format!("delay of {} minutes is out of range", delay),
        });
    }
    if delay.fract() != 0.0 || delay % 60.0 != 0.0 {
        return Err(PrepError::UnsupportedResolution(format!(
            "delay of {} minutes on {} '{}' is not a whole number of hours",
            delay, source.object_type, source.object_name
        )));
    }
    Ok(delay as i64)
}

fn check_hourly(series: &Series, what: &str) -> Result<()> {
    match series.min_spacing() {
        Some(spacing) if spacing < Duration::hours(1) => Err(PrepError::UnsupportedResolution(
            format!("{} has points {} minutes apart", what, spacing.num_minutes()),
        )),
        _ => Ok(()),
    }
}

fn fill_hourly(series: &Series, last: NaiveDateTime) -> Series {
    match series.first_timestamp() {
        Some(first) => series.forward_fill_onto(hourly_grid(floor_hour(first), last)),
        None => Series::new(),
    }
}

/// Add the delayed discharge of `source` to the inflow in `datapoints`.
pub fn add_water_in_transit(
    datapoints: Datapoints,
    source: &TransitSource,
    ctx: &TransformContext<'_>,
) -> Result<Datapoints> {
    let inflow = match &datapoints {
        Datapoints::Series(series) => series,
        Datapoints::Scalar(_) => {
            return Err(PrepError::UnsupportedInput(format!(
                "water in transit from {} '{}' needs an inflow series, got a scalar",
                source.object_type, source.object_name
            )))
        }
    };
    check_hourly(inflow, "inflow")?;

    let shape = discharge_shape(ctx.model, source)?;
    let max_delay = shape.iter().map(|(delay, _)| *delay).max().unwrap_or(0);
    let ids = vec![source.external_id.clone()];
    let fetched = merge::retrieve_range(
        ctx.store,
        &ids,
        offset_by(ctx.start, -max_delay, "ADD_WATER_IN_TRANSIT")?,
        ctx.start,
    )?;
    let discharge = match fetched.get(&source.external_id) {
        Some(series) if !series.is_empty() => series,
        _ => {
            warn!(
                "No discharge '{}' for {} '{}', inflow left unchanged",
                source.external_id, source.object_type, source.object_name
            );
            return Ok(datapoints);
        }
    };
    check_hourly(discharge, "discharge")?;

    let discharge = fill_hourly(discharge, ctx.start - Duration::hours(1));
    let mut total = fill_hourly(inflow, ctx.end);
    for (delay, fraction) in &shape {
        let arriving = discharge
            .shift_minutes(*delay)
            .map_values(|v| v * fraction);
        total = total.add_aligned(&arriving, 0.0);
    }
    debug!(
        "Added {} delayed discharge component(s) from '{}' to inflow",
        shape.len(),
        source.external_id
    );
    Ok(Datapoints::Series(total.slice(ctx.start, Some(ctx.end))))
}
