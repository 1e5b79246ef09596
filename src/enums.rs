/// Plane of a frame taken from the volume grid.
///
/// The volume is stored in acquisition order, so `Axial` is the acquisition
/// plane (index runs along the slices), `Coronal` fixes a row and `Sagittal`
/// fixes a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [
        Orientation::Axial,
        Orientation::Coronal,
        Orientation::Sagittal,
    ];
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Orientation::Axial => "axial",
            Orientation::Coronal => "coronal",
            Orientation::Sagittal => "sagittal",
        };
        f.write_str(name)
    }
}

/// Resampling policy along the through-plane axis of reformatted frames.
///
/// `Nearest` is cheaper and keeps the original voxel values, at the cost of
/// a blocky look when the slice spacing is much coarser than the pixel
/// spacing. `Linear` blends the two neighbouring slices and looks smoother.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    Nearest,
    #[default]
    Linear,
}

/// How the slices of a series were put in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortBy {
    /// Projection of ImagePositionPatient onto the slice normal.
    ImagePositionPatient,
    /// InstanceNumber, then discovery order.
    InstanceNumber,
}
