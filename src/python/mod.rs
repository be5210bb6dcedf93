#![allow(clippy::useless_conversion)]

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use pyo3::{
    exceptions::PyValueError,
    prelude::*,
    types::{PyDict, PyList},
    wrap_pyfunction,
};

use crate::{
    error::Error,
    models::Alignment,
    settings::{CorrespondenceSettings, GpaSettings, LpStrategy, Reflection},
    types::{PointSet, Rotation},
};

fn to_py_err(err: Error) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn matrix_from_python(obj: &Bound<'_, PyAny>) -> PyResult<PointSet> {
    let rows: Vec<Vec<f64>> = obj.extract()?;
    if rows.is_empty() {
        return Ok(PointSet::from_row_slice(0, 0, &[]));
    }

    let width = rows[0].len();
    if !rows.iter().all(|r| r.len() == width) {
        return Err(PyValueError::new_err("all rows must have the same length"));
    }

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Ok(PointSet::from_row_slice(flat.len() / width.max(1), width, &flat))
}

fn rotation_from_python(obj: &Bound<'_, PyAny>) -> PyResult<Rotation> {
    let m = matrix_from_python(obj)?;
    if m.shape() != (3, 3) {
        return Err(PyValueError::new_err("rotation must be a 3x3 matrix"));
    }
    Ok(Rotation::from_column_slice(m.as_slice()))
}

fn rows_of<'a>(values: impl Iterator<Item = &'a f64>, width: usize) -> Vec<Vec<f64>> {
    let flat: Vec<f64> = values.copied().collect();
    flat.chunks(width.max(1)).map(<[f64]>::to_vec).collect()
}

fn matrix_to_python<'py>(py: Python<'py>, matrix: &PointSet) -> PyResult<Bound<'py, PyList>> {
    let rows: Vec<Vec<f64>> = matrix
        .row_iter()
        .map(|row| row.iter().copied().collect::<Vec<f64>>())
        .collect();
    Ok(PyList::new_bound(py, rows))
}

fn rotation_to_python<'py>(py: Python<'py>, rotation: &Rotation) -> Bound<'py, PyList> {
    PyList::new_bound(py, rows_of(rotation.transpose().iter(), 3))
}

fn alignment_to_python<'py>(py: Python<'py>, alignment: &Alignment) -> PyResult<Bound<'py, PyDict>> {
    let out = PyDict::new_bound(py);
    out.set_item("distance", alignment.distance)?;
    out.set_item("rotation", rotation_to_python(py, &alignment.rotation))?;
    out.set_item("permutation", alignment.permutation.as_slice().to_vec())?;
    out.set_item("gamma", alignment.gamma)?;
    out.set_item("iterations", alignment.iterations)?;
    out.set_item("converged", alignment.converged)?;
    Ok(out)
}

#[pyclass(name = "CorrespondenceSettings")]
#[derive(Clone)]
pub struct PyCorrespondenceSettings {
    inner: CorrespondenceSettings,
}

#[pymethods]
impl PyCorrespondenceSettings {
    #[new]
    #[pyo3(signature = (
        mirror=false,
        globalize=true,
        max_iterations=1000,
        relative_tolerance=1e-5,
        scale=false,
        use_lp=false,
        time_limit=None,
    ))]
    pub fn new(
        mirror: bool,
        globalize: bool,
        max_iterations: usize,
        relative_tolerance: f64,
        scale: bool,
        use_lp: bool,
        time_limit: Option<f64>,
    ) -> PyResult<Self> {
        let time_limit = time_limit
            .map(Duration::try_from_secs_f64)
            .transpose()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let settings = CorrespondenceSettings {
            mirror,
            globalize,
            max_iterations,
            relative_tolerance,
            scale,
            lp_strategy: if use_lp {
                LpStrategy::Simplex
            } else {
                LpStrategy::Exact
            },
            time_limit,
            ..CorrespondenceSettings::default()
        };
        Ok(Self { inner: settings })
    }

    #[getter]
    pub fn mirror(&self) -> bool {
        self.inner.mirror
    }

    #[getter]
    pub fn max_iterations(&self) -> usize {
        self.inner.max_iterations
    }
}

#[pyclass(name = "GpaSettings")]
#[derive(Clone)]
pub struct PyGpaSettings {
    inner: GpaSettings,
}

#[pymethods]
impl PyGpaSettings {
    #[new]
    #[pyo3(signature = (use_scaling=true, max_iterations=5, tolerance=1e-4, allow_reflection=false))]
    pub fn new(
        use_scaling: bool,
        max_iterations: usize,
        tolerance: f64,
        allow_reflection: bool,
    ) -> Self {
        let settings = GpaSettings {
            use_scaling,
            max_iterations,
            tolerance,
            reflection: if allow_reflection {
                Reflection::Allow
            } else {
                Reflection::Forbid
            },
        };
        Self { inner: settings }
    }

    #[getter]
    pub fn use_scaling(&self) -> bool {
        self.inner.use_scaling
    }
}

#[pyfunction(signature = (reference, moving, settings=None))]
pub fn gpd_py(
    reference: Bound<PyAny>,
    moving: Bound<PyAny>,
    settings: Option<PyCorrespondenceSettings>,
) -> PyResult<Py<PyDict>> {
    let py = reference.py();
    let x = matrix_from_python(&reference)?;
    let y = matrix_from_python(&moving)?;
    let result = crate::api::gpd(&x, &y, settings.map(|s| s.inner)).map_err(to_py_err)?;
    Ok(alignment_to_python(py, &result)?.unbind())
}

#[pyfunction(signature = (shapes, initial=None, settings=None))]
pub fn correspondence_py(
    shapes: Bound<PyList>,
    initial: Option<Bound<PyDict>>,
    settings: Option<PyCorrespondenceSettings>,
) -> PyResult<Py<PyDict>> {
    let py = shapes.py();
    let sets: Vec<PointSet> = shapes
        .iter()
        .map(|s| matrix_from_python(&s))
        .collect::<PyResult<_>>()?;

    let seeds = match initial {
        Some(dict) => {
            let raw: HashMap<(usize, usize), Bound<PyAny>> = dict.extract()?;
            let mut seeds = BTreeMap::new();
            for (key, value) in raw {
                seeds.insert(key, rotation_from_python(&value)?);
            }
            Some(seeds)
        }
        None => None,
    };

    let result = crate::api::correspondence(&sets, seeds.as_ref(), settings.map(|s| s.inner))
        .map_err(to_py_err)?;

    let out = PyDict::new_bound(py);
    out.set_item("distances", matrix_to_python(py, &result.distances)?)?;
    let rotations = PyList::empty_bound(py);
    for row in &result.rotations {
        let py_row = PyList::empty_bound(py);
        for r in row {
            py_row.append(rotation_to_python(py, r))?;
        }
        rotations.append(py_row)?;
    }
    out.set_item("rotations", rotations)?;
    out.set_item(
        "permutations",
        result
            .permutations()
            .into_iter()
            .map(|(k, p)| (k, p.into_vec()))
            .collect::<HashMap<_, _>>(),
    )?;
    out.set_item(
        "failures",
        result
            .failures
            .iter()
            .map(|(k, e)| (*k, e.to_string()))
            .collect::<HashMap<_, _>>(),
    )?;
    if let Some(global) = &result.global {
        let per_shape = PyDict::new_bound(py);
        for (index, g) in &global.alignments {
            let entry = PyDict::new_bound(py);
            entry.set_item("rotation", rotation_to_python(py, &g.rotation))?;
            entry.set_item("permutation", g.permutation.as_slice().to_vec())?;
            per_shape.set_item(*index, entry)?;
        }
        out.set_item("global", per_shape)?;
        out.set_item("unreachable", global.unreachable.clone())?;
    }
    Ok(out.unbind())
}

#[pyfunction(signature = (shapes, settings=None))]
pub fn run_gpa_py(shapes: Bound<PyList>, settings: Option<PyGpaSettings>) -> PyResult<Py<PyDict>> {
    let py = shapes.py();
    let sets: Vec<PointSet> = shapes
        .iter()
        .map(|s| matrix_from_python(&s))
        .collect::<PyResult<_>>()?;
    let result = crate::api::run_gpa(&sets, settings.map(|s| s.inner)).map_err(to_py_err)?;

    let out = PyDict::new_bound(py);
    out.set_item("mean", matrix_to_python(py, &result.mean)?)?;
    let aligned = PyList::empty_bound(py);
    for shape in &result.aligned {
        aligned.append(matrix_to_python(py, shape)?)?;
    }
    out.set_item("aligned", aligned)?;
    out.set_item("centroid_sizes", result.centroid_sizes.clone())?;
    out.set_item("procrustes_distances", result.procrustes_distances.clone())?;
    out.set_item("iterations", result.iterations)?;
    out.set_item("converged", result.converged)?;
    Ok(out.unbind())
}

#[pymodule]
fn _morphalign_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyCorrespondenceSettings>()?;
    m.add_class::<PyGpaSettings>()?;
    m.add_function(wrap_pyfunction!(gpd_py, m)?)?;
    m.add_function(wrap_pyfunction!(correspondence_py, m)?)?;
    m.add_function(wrap_pyfunction!(run_gpa_py, m)?)?;
    Ok(())
}
