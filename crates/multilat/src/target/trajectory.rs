//! Waypoint trajectory loaded from a JSON document of the form
//! `{"waypoints": [[x, y, z], ...]}`.

use std::path::Path;

use serde_json::Value;

use multilat_core::{MultilatError, Point3, Result};

#[derive(Debug, Clone)]
pub struct Trajectory {
    waypoints: Vec<Point3>,
    cursor: usize,
    loop_path: bool,
}

impl Trajectory {
    pub fn from_json_file(path: impl AsRef<Path>, loop_path: bool) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content, loop_path)
    }

    /// Rejects the document unless every waypoint is a 3-element
    /// numeric array.
    pub fn from_json_str(content: &str, loop_path: bool) -> Result<Self> {
        let document: Value = serde_json::from_str(content)
            .map_err(|e| MultilatError::trajectory(format!("invalid JSON: {e}")))?;

        let entries = document
            .get("waypoints")
            .and_then(Value::as_array)
            .ok_or_else(|| MultilatError::trajectory("missing \"waypoints\" array"))?;

        if entries.is_empty() {
            return Err(MultilatError::trajectory("empty waypoint list"));
        }

        let mut waypoints = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let coords = entry
                .as_array()
                .filter(|coords| coords.len() == 3)
                .ok_or_else(|| {
                    MultilatError::trajectory(format!(
                        "waypoint {index} is not a 3-element array"
                    ))
                })?;

            let mut point = [0.0f64; 3];
            for (axis, coord) in coords.iter().enumerate() {
                point[axis] = coord.as_f64().ok_or_else(|| {
                    MultilatError::trajectory(format!(
                        "waypoint {index} has a non-numeric coordinate"
                    ))
                })?;
            }
            waypoints.push(point.into());
        }

        Ok(Self {
            waypoints,
            cursor: 0,
            loop_path,
        })
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn current(&self) -> Point3 {
        self.waypoints[self.cursor]
    }

    /// Moves the cursor one waypoint forward. Wraps when configured to
    /// loop, otherwise holds the final waypoint.
    pub fn advance(&mut self) -> Point3 {
        if self.cursor + 1 < self.waypoints.len() {
            self.cursor += 1;
        } else if self.loop_path {
            self.cursor = 0;
        }
        self.current()
    }
}
