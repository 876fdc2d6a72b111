//! Cluster discovery: partition occupied cells into maximal same-colour,
//! 4-connected components.

use crate::matrix::{Matrix, Position};
use crate::token::Token;
use std::fmt;

/// Dense index into a [`ClusterRegistry`]. Only valid until the next recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(pub usize);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `ClusterId -> members`, in the order clusters and members were discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterRegistry {
    members: Vec<Vec<Position>>,
}

impl ClusterRegistry {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self, id: ClusterId) -> Option<&[Position]> {
        self.members.get(id.0).map(Vec::as_slice)
    }

    /// Member count of `id`; 0 for an unknown id.
    pub fn size(&self, id: ClusterId) -> usize {
        self.members.get(id.0).map_or(0, Vec::len)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClusterId, &[Position])> {
        self.members
            .iter()
            .enumerate()
            .map(|(i, m)| (ClusterId(i), m.as_slice()))
    }

    /// True if some cluster has two or more members.
    pub fn has_removable(&self) -> bool {
        self.members.iter().any(|m| m.len() >= 2)
    }

    pub fn largest(&self) -> usize {
        self.members.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Recompute every token's cluster id and return the registry.
///
/// All ids are cleared first. Cells are then scanned column-major; each token
/// still unassigned seeds a new cluster, grown by an explicit-stack DFS over
/// occupied, same-coloured 4-neighbours. A token is assigned exactly once,
/// so cycles in the adjacency graph are harmless and the pass is linear in the
/// number of occupied cells.
pub fn find_clusters(board: &mut Matrix<Token>) -> ClusterRegistry {
    for (_, token) in board.iter_mut() {
        token.cluster = None;
    }

    let (cols, rows) = (board.num_cols(), board.num_rows());
    let mut registry = ClusterRegistry::default();
    let mut stack = Vec::new();

    for x in 0..cols {
        for y in 0..rows {
            let start = Position::new(x, y);
            let color = match board.cell(start) {
                Some(token) if token.cluster.is_none() => token.color(),
                _ => continue,
            };

            let id = ClusterId(registry.members.len());
            if let Some(token) = board.cell_mut(start) {
                token.cluster = Some(id);
            }
            let mut members = vec![start];
            stack.push(start);

            while let Some(pos) = stack.pop() {
                for next in pos.neighbors(cols, rows) {
                    if let Some(token) = board.cell_mut(next) {
                        if token.color() == color && token.cluster.is_none() {
                            token.cluster = Some(id);
                            members.push(next);
                            stack.push(next);
                        }
                    }
                }
            }
            registry.members.push(members);
        }
    }

    log::debug!(
        "found {} clusters on {}x{} board (largest {})",
        registry.len(),
        cols,
        rows,
        registry.largest()
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{TokenColor, TokenId};
    use proptest::prelude::*;
    use std::collections::HashSet;

    const R: TokenColor = TokenColor::Red;
    const B: TokenColor = TokenColor::Cyan;
    const G: TokenColor = TokenColor::Green;

    /// Columns written bottom-up.
    fn board(columns: &[&[TokenColor]]) -> Matrix<Token> {
        let rows = columns[0].len();
        let mut serial = 0;
        Matrix::new(columns.len(), rows, |x, y| {
            serial += 1;
            Token::new(TokenId(serial), columns[x][y], x, y)
        })
        .unwrap()
    }

    fn id_at(b: &Matrix<Token>, x: usize, y: usize) -> ClusterId {
        b.get(x, y).unwrap().unwrap().cluster().unwrap()
    }

    #[test]
    fn test_l_shape_and_singleton() {
        // (0,0)=R (1,0)=R (0,1)=R (1,1)=B
        let mut b = board(&[&[R, R], &[R, B]]);
        let reg = find_clusters(&mut b);
        assert_eq!(reg.len(), 2);
        let red = id_at(&b, 0, 0);
        assert_eq!(id_at(&b, 1, 0), red);
        assert_eq!(id_at(&b, 0, 1), red);
        assert_eq!(reg.size(red), 3);
        let mut members = reg.members(red).unwrap().to_vec();
        members.sort();
        assert_eq!(
            members,
            vec![Position::new(0, 0), Position::new(0, 1), Position::new(1, 0)]
        );
        assert_eq!(reg.size(id_at(&b, 1, 1)), 1);
        assert!(reg.has_removable());
    }

    #[test]
    fn test_diagonals_do_not_connect() {
        let mut b = board(&[&[R, B], &[B, R]]);
        let reg = find_clusters(&mut b);
        assert_eq!(reg.len(), 4);
        assert!(!reg.has_removable());
    }

    #[test]
    fn test_ring_is_one_cluster() {
        // 3x3 ring of red around a green centre: a cycle in the adjacency graph.
        let mut b = board(&[&[R, R, R], &[R, G, R], &[R, R, R]]);
        let reg = find_clusters(&mut b);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.size(id_at(&b, 0, 0)), 8);
        assert_eq!(reg.size(id_at(&b, 1, 1)), 1);
    }

    #[test]
    fn test_empty_cells_split_clusters() {
        let mut b = board(&[&[R, R, R]]);
        b.take(0, 1).unwrap();
        let reg = find_clusters(&mut b);
        assert_eq!(reg.len(), 2);
        assert_ne!(id_at(&b, 0, 0), id_at(&b, 0, 2));
    }

    #[test]
    fn test_recompute_resets_stale_ids() {
        let mut b = board(&[&[R, R], &[B, B]]);
        find_clusters(&mut b);
        b.take(0, 0).unwrap();
        b.take(0, 1).unwrap();
        b.compact_down_and_left();
        let reg = find_clusters(&mut b);
        assert_eq!(reg.len(), 1);
        assert_eq!(id_at(&b, 0, 0), ClusterId(0));
    }

    #[test]
    fn test_large_uniform_region_does_not_recurse() {
        let column = vec![R; 200];
        let columns: Vec<&[TokenColor]> = (0..200).map(|_| column.as_slice()).collect();
        let mut b = board(&columns);
        let reg = find_clusters(&mut b);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.size(ClusterId(0)), 40_000);
    }

    fn arb_board() -> impl Strategy<Value = Matrix<Token>> {
        (1usize..8, 1usize..8).prop_flat_map(|(cols, rows)| {
            prop::collection::vec(0usize..4, cols * rows).prop_map(move |cells| {
                let mut b = Matrix::new(cols, rows, |x, y| {
                    let c = cells[x * rows + y];
                    Token::new(TokenId(0), TokenColor::ALL[c % 3], x, y)
                })
                .unwrap();
                // Colour index 3 marks a hole.
                for x in 0..cols {
                    for y in 0..rows {
                        if cells[x * rows + y] == 3 {
                            b.take(x, y).unwrap();
                        }
                    }
                }
                b
            })
        })
    }

    /// Flood fill by plain BFS over same-colour neighbours, as an independent oracle.
    fn reachable(b: &Matrix<Token>, start: Position) -> HashSet<Position> {
        let color = b.cell(start).unwrap().color();
        let mut seen = HashSet::from([start]);
        let mut queue = std::collections::VecDeque::from([start]);
        while let Some(p) = queue.pop_front() {
            for n in p.neighbors(b.num_cols(), b.num_rows()) {
                if b.cell(n).is_some_and(|t| t.color() == color) && seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        seen
    }

    proptest! {
        #[test]
        fn prop_clusters_are_connected_components(b in arb_board()) {
            let mut b = b;
            let reg = find_clusters(&mut b);
            let mut covered = 0;
            for (id, members) in reg.iter() {
                let expected = reachable(&b, members[0]);
                let actual: HashSet<Position> = members.iter().copied().collect();
                prop_assert_eq!(actual.len(), members.len());
                prop_assert_eq!(&actual, &expected);
                for &p in members {
                    prop_assert_eq!(b.cell(p).unwrap().cluster(), Some(id));
                }
                covered += members.len();
            }
            prop_assert_eq!(covered, b.occupied_count());
        }

        #[test]
        fn prop_adjacent_same_colour_share_id(b in arb_board()) {
            let mut b = b;
            find_clusters(&mut b);
            for (p, t) in b.iter() {
                for n in p.neighbors(b.num_cols(), b.num_rows()) {
                    if let Some(u) = b.cell(n) {
                        prop_assert_eq!(t.color() == u.color(), t.cluster() == u.cluster());
                    }
                }
            }
        }
    }
}
