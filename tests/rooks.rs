//! Place N non-attacking rooks on an N x N board: one per row, one per
//! column. A classic "exactly one of a row" / "exactly one of a column"
//! exercise for generalized cardinality clauses.
use catsat::prelude::*;

const N: usize = 8;

#[test]
fn eight_rooks_one_per_row_and_column() {
    let mut problem = Problem::new(Config::with_seed(20260728));

    let rook = |problem: &mut Problem, row: usize, col: usize| -> Literal {
        problem.proposition(Call::new("rook", vec![Term::Int(row as i64), Term::Int(col as i64)]))
    };

    let mut board = vec![vec![Literal::new(1, true); N]; N];
    for row in 0..N {
        for col in 0..N {
            board[row][col] = rook(&mut problem, row, col);
        }
    }

    for row in 0..N {
        problem.unique(board[row].clone()).unwrap();
    }
    for col in 0..N {
        let column: Vec<Literal> = (0..N).map(|row| board[row][col]).collect();
        problem.unique(column).unwrap();
    }

    problem.finalize().unwrap();
    let solution = problem.solve().expect("8-rooks is satisfiable");
    assert_eq!(solution.validate(&problem), Ok(()));

    for row in 0..N {
        let placed = (0..N).filter(|&col| solution.is_true(board[row][col])).count();
        assert_eq!(placed, 1, "row {row} should have exactly one rook");
    }
    for col in 0..N {
        let placed = (0..N).filter(|&row| solution.is_true(board[row][col])).count();
        assert_eq!(placed, 1, "column {col} should have exactly one rook");
    }
}
