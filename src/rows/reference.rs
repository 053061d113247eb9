//! Reference tabs maintained by hand in the spreadsheet: case hits, brands
//! and the player list.

use super::{Cell, Column, RowError, RowReader, TableRow};

/// A named insert worth tracking; also drives the case-hit search runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaseHit {
    pub name: String,
    pub set: String,
    pub image: String,
    pub kind: String,
    pub value: i64,
    pub sport: String,
}

impl TableRow for CaseHit {
    const COLUMNS: &'static [Column] = &[
        Column::stored("Name"),
        Column::stored("Set"),
        Column::stored("Image"),
        Column::stored("Type"),
        Column::stored("Value"),
        Column::stored("Sport"),
    ];

    const MIN_CELLS: usize = 5;

    fn cell(&self, column: &str) -> Cell {
        match column {
            "Name" => Cell::text(self.name.as_str()),
            "Set" => Cell::text(self.set.as_str()),
            "Image" => Cell::text(self.image.as_str()),
            "Type" => Cell::text(self.kind.as_str()),
            "Value" => Cell::from(self.value),
            "Sport" => Cell::text(self.sport.as_str()),
            _ => Cell::text(""),
        }
    }

    fn from_row(row: &[Cell]) -> Result<Self, RowError> {
        let r = RowReader::new::<Self>(row)?;
        Ok(Self {
            name: r.text("Name")?,
            set: r.text("Set")?,
            image: r.text("Image")?,
            kind: r.text("Type")?,
            value: r.int("Value")?,
            sport: r.text("Sport")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Brand {
    pub name: String,
    pub manufacturer: String,
    pub years: String,
    pub value: i64,
}

impl TableRow for Brand {
    const COLUMNS: &'static [Column] = &[
        Column::stored("Name"),
        Column::stored("Manufacturer"),
        Column::stored("Years"),
        Column::stored("Value"),
    ];

    const MIN_CELLS: usize = 4;

    fn cell(&self, column: &str) -> Cell {
        match column {
            "Name" => Cell::text(self.name.as_str()),
            "Manufacturer" => Cell::text(self.manufacturer.as_str()),
            "Years" => Cell::text(self.years.as_str()),
            "Value" => Cell::from(self.value),
            _ => Cell::text(""),
        }
    }

    fn from_row(row: &[Cell]) -> Result<Self, RowError> {
        let r = RowReader::new::<Self>(row)?;
        Ok(Self {
            name: r.text("Name")?,
            manufacturer: r.text("Manufacturer")?,
            years: r.text("Years")?,
            value: r.int("Value")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Player {
    pub name: String,
    pub position: String,
    pub collection_rc_year: i64,
    pub start_year: i64,
    pub end_year: i64,
    pub status: String,
    pub mvp: i64,
    pub hof: String,
    pub pc: String,
    pub goat: String,
    pub collect: String,
    pub collection_area: String,
}

impl TableRow for Player {
    const COLUMNS: &'static [Column] = &[
        Column::stored("Name"),
        Column::stored("Position"),
        Column::stored("CollectionRCYear"),
        Column::stored("StartYear"),
        Column::stored("EndYear"),
        Column::stored("Status"),
        Column::stored("MVP"),
        Column::stored("HOF"),
        Column::stored("PC"),
        Column::stored("GOAT"),
        Column::stored("Collect"),
        Column::stored("CollectionArea"),
    ];

    const MIN_CELLS: usize = 6;

    fn cell(&self, column: &str) -> Cell {
        match column {
            "Name" => Cell::text(self.name.as_str()),
            "Position" => Cell::text(self.position.as_str()),
            "CollectionRCYear" => Cell::from(self.collection_rc_year),
            "StartYear" => Cell::from(self.start_year),
            "EndYear" => Cell::from(self.end_year),
            "Status" => Cell::text(self.status.as_str()),
            "MVP" => Cell::from(self.mvp),
            "HOF" => Cell::text(self.hof.as_str()),
            "PC" => Cell::text(self.pc.as_str()),
            "GOAT" => Cell::text(self.goat.as_str()),
            "Collect" => Cell::text(self.collect.as_str()),
            "CollectionArea" => Cell::text(self.collection_area.as_str()),
            _ => Cell::text(""),
        }
    }

    fn from_row(row: &[Cell]) -> Result<Self, RowError> {
        let r = RowReader::new::<Self>(row)?;
        Ok(Self {
            name: r.text("Name")?,
            position: r.text("Position")?,
            collection_rc_year: r.int_or_zero("CollectionRCYear")?,
            start_year: r.int_or_zero("StartYear")?,
            end_year: r.int_or_zero("EndYear")?,
            status: r.text("Status")?,
            mvp: r.int_or_zero("MVP")?,
            hof: r.text("HOF")?,
            pc: r.text("PC")?,
            goat: r.text("GOAT")?,
            collect: r.text("Collect")?,
            collection_area: r.text("CollectionArea")?,
        })
    }
}
