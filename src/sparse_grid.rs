//! square 2‑D store centred on (0,0) that doubles whenever a write lands
//! outside of it

use bevy::math::IVec2;

pub struct SparseGrid<T> {
    cells: Vec<Option<T>>,
    width: i32,
}

impl<T> SparseGrid<T> {
    /// `width` is rounded up to an even number ≥ 2 so the origin stays centred
    pub fn new(width: i32) -> Self {
        let mut width = width.max(2);
        if width % 2 == 1 {
            width += 1;
        }
        let mut cells = Vec::new();
        cells.resize_with((width * width) as usize, || None);
        Self { cells, width }
    }

    /// current side length of the backing store
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    fn slot(&self, c: IVec2) -> Option<usize> {
        let half = self.width / 2;
        let (x, y) = (c.x + half, c.y + half);
        if x < 0 || y < 0 || x >= self.width || y >= self.width {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    pub fn at(&self, c: IVec2) -> Option<&T> {
        self.slot(c).and_then(|i| self.cells[i].as_ref())
    }

    pub fn at_mut(&mut self, c: IVec2) -> Option<&mut T> {
        match self.slot(c) {
            Some(i) => self.cells[i].as_mut(),
            None => None,
        }
    }

    pub fn contains(&self, c: IVec2) -> bool {
        self.at(c).is_some()
    }

    pub fn set(&mut self, c: IVec2, value: T) {
        let i = self.slot_growing(c);
        self.cells[i] = Some(value);
    }

    /// value at `c`, created with `f` (growing the store) when absent
    pub fn get_or_insert_with(&mut self, c: IVec2, f: impl FnOnce() -> T) -> &mut T {
        let i = self.slot_growing(c);
        self.cells[i].get_or_insert_with(f)
    }

    fn slot_growing(&mut self, c: IVec2) -> usize {
        loop {
            match self.slot(c) {
                Some(i) => return i,
                None => self.grow(),
            }
        }
    }

    pub fn remove(&mut self, c: IVec2) -> Option<T> {
        self.slot(c).and_then(|i| self.cells[i].take())
    }

    /// double the side length, re‑centring every stored value
    fn grow(&mut self) {
        let old_width = self.width;
        let new_width = old_width * 2;
        let offset = old_width / 2;

        let mut cells = Vec::new();
        cells.resize_with((new_width * new_width) as usize, || None);

        for (i, cell) in self.cells.drain(..).enumerate() {
            if cell.is_none() {
                continue;
            }
            let x = i as i32 % old_width + offset;
            let y = i as i32 / old_width + offset;
            cells[(y * new_width + x) as usize] = cell;
        }

        self.cells = cells;
        self.width = new_width;
    }

    /// every stored value with its logical coordinate
    pub fn iter(&self) -> impl Iterator<Item = (IVec2, &T)> + '_ {
        let width = self.width;
        let half = width / 2;
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            cell.as_ref().map(|v| {
                let c = IVec2::new(i as i32 % width - half, i as i32 / width - half);
                (c, v)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_out_of_bounds_read_as_none() {
        let grid: SparseGrid<u32> = SparseGrid::new(4);
        assert!(grid.at(IVec2::new(0, 0)).is_none());
        assert!(grid.at(IVec2::new(1000, -1000)).is_none());
    }

    #[test]
    fn growth_preserves_every_value() {
        let mut grid = SparseGrid::new(2);
        let writes = [
            (IVec2::new(0, 0), 1),
            (IVec2::new(-1, 0), 2),
            (IVec2::new(0, -1), 3),
            (IVec2::new(5, 5), 4),
            (IVec2::new(-40, 17), 5),
            (IVec2::new(0, 0), 6),
            (IVec2::new(130, -129), 7),
        ];
        for (c, v) in writes {
            grid.set(c, v);
        }
        assert!(grid.width() >= 260);

        assert_eq!(grid.at(IVec2::new(0, 0)), Some(&6));
        assert_eq!(grid.at(IVec2::new(-1, 0)), Some(&2));
        assert_eq!(grid.at(IVec2::new(0, -1)), Some(&3));
        assert_eq!(grid.at(IVec2::new(5, 5)), Some(&4));
        assert_eq!(grid.at(IVec2::new(-40, 17)), Some(&5));
        assert_eq!(grid.at(IVec2::new(130, -129)), Some(&7));
        assert_eq!(grid.iter().count(), 6);
    }

    #[test]
    fn get_or_insert_keeps_existing_values() {
        let mut grid = SparseGrid::new(2);
        *grid.get_or_insert_with(IVec2::new(9, 9), || 1) += 10;
        assert_eq!(*grid.get_or_insert_with(IVec2::new(9, 9), || 99), 11);
        assert_eq!(grid.at(IVec2::new(9, 9)), Some(&11));
    }

    #[test]
    fn odd_width_is_rounded_up() {
        let grid: SparseGrid<u8> = SparseGrid::new(7);
        assert_eq!(grid.width(), 8);
    }

    #[test]
    fn iter_reports_logical_coordinates() {
        let mut grid = SparseGrid::new(4);
        grid.set(IVec2::new(-2, 1), 'a');
        grid.set(IVec2::new(9, -3), 'b');
        let mut seen: Vec<_> = grid.iter().map(|(c, v)| (c, *v)).collect();
        seen.sort_by_key(|(c, _)| (c.x, c.y));
        assert_eq!(seen, vec![(IVec2::new(-2, 1), 'a'), (IVec2::new(9, -3), 'b')]);
    }
}
