use std::collections::HashMap;

use crate::types::SpriteRecord;

/// Lookup tables from sprite numbering to record index, built once after parsing.
#[derive(Debug, Default)]
pub struct SpriteIndex {
    by_numbers: HashMap<(u16, u16), usize>,
    by_group: HashMap<u16, Vec<usize>>,
}

impl SpriteIndex {
    pub fn new(sprites: &[SpriteRecord]) -> Self {
        let mut res = Self::default();

        sprites.iter().enumerate().for_each(|(index, sprite)| {
            // first one wins, group and number are not unique
            res.by_numbers
                .entry((sprite.group, sprite.number))
                .or_insert(index);

            res.by_group.entry(sprite.group).or_default().push(index);
        });

        res
    }

    pub fn find(&self, group: u16, number: u16) -> Option<usize> {
        self.by_numbers.get(&(group, number)).copied()
    }

    /// Record indexes in file order.
    pub fn group(&self, group: u16) -> &[usize] {
        self.by_group
            .get(&group)
            .map(|indexes| indexes.as_slice())
            .unwrap_or(&[])
    }
}
