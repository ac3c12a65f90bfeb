use std::collections::HashSet;

use log::debug;

use super::{
    error::ExportError,
    graph::{Attribute, Constant, Graph, Node},
};

/// Evaluates every node whose inputs are all stored constants and replaces it with the result.
///
/// Only `Identity`, `Transpose` (rank 2), `Add`, `Sub`, `Mul` (same shape or scalar operand)
/// and `MatMul` (rank 2) are evaluated; other nodes are left in place. Initializers no longer
/// referenced afterwards are dropped.
///
/// # Returns
/// The number of nodes folded away.
pub fn fold_constants(graph: &mut Graph) -> Result<usize, ExportError> {
    let mut folded = 0;
    // Initializers that are also graph inputs can be overridden at run time.
    let overridable: HashSet<String> = graph.inputs.iter().map(|v| v.name.clone()).collect();
    let graph_outputs: HashSet<String> = graph.outputs.iter().map(|v| v.name.clone()).collect();

    loop {
        let candidate = graph.nodes.iter().enumerate().find_map(|(index, node)| {
            let constant_inputs = node.inputs.iter().all(|name| {
                !overridable.contains(name) && graph.initializer(name).is_some()
            });
            let feeds_output = node.outputs.iter().any(|name| graph_outputs.contains(name));
            if node.outputs.len() != 1 || !constant_inputs || feeds_output {
                return None;
            }
            let args: Vec<&Constant> = node
                .inputs
                .iter()
                .filter_map(|name| graph.initializer(name))
                .collect();
            evaluate(node, &args).map(|result| (index, result))
        });

        let Some((index, result)) = candidate else {
            break;
        };
        let node = graph.nodes.remove(index);
        debug!("folded {} ({})", node.name, node.op_type);
        let result = result?;
        graph
            .initializers
            .push(Constant::new(node.outputs[0].clone(), result.0, result.1));
        folded += 1;
    }

    let used: HashSet<&String> = graph
        .nodes
        .iter()
        .flat_map(|node| node.inputs.iter())
        .chain(graph.outputs.iter().map(|v| &v.name))
        .collect();
    let unused: Vec<String> = graph
        .initializers
        .iter()
        .filter(|c| !used.contains(&c.name))
        .map(|c| c.name.clone())
        .collect();
    graph.initializers.retain(|c| !unused.contains(&c.name));
    Ok(folded)
}

type Folded = Result<(Vec<i64>, Vec<f32>), ExportError>;

/// `None` means the node is not foldable and stays in the graph.
fn evaluate(node: &Node, args: &[&Constant]) -> Option<Folded> {
    match (node.op_type.as_str(), args) {
        ("Identity", [a]) => Some(Ok((a.dims.clone(), a.data.clone()))),
        ("Transpose", [a]) if a.dims.len() == 2 => {
            let perm = match node.attribute("perm") {
                Some(Attribute::Ints(perm)) => perm.clone(),
                _ => vec![1, 0],
            };
            match perm.as_slice() {
                [0, 1] => Some(Ok((a.dims.clone(), a.data.clone()))),
                [1, 0] => Some(Ok(transpose(a))),
                _ => Some(Err(ExportError::Fold(format!(
                    "{}: invalid perm {perm:?} for a rank-2 tensor",
                    node.name
                )))),
            }
        }
        ("Add", [a, b]) => elementwise(a, b, |x, y| x + y),
        ("Sub", [a, b]) => elementwise(a, b, |x, y| x - y),
        ("Mul", [a, b]) => elementwise(a, b, |x, y| x * y),
        ("MatMul", [a, b]) if a.dims.len() == 2 && b.dims.len() == 2 => Some(matmul(node, a, b)),
        _ => None,
    }
}

fn transpose(a: &Constant) -> (Vec<i64>, Vec<f32>) {
    let (rows, cols) = (a.dims[0] as usize, a.dims[1] as usize);
    let mut data = vec![0.0; a.data.len()];
    for r in 0..rows {
        for c in 0..cols {
            data[c * rows + r] = a.data[r * cols + c];
        }
    }
    (vec![a.dims[1], a.dims[0]], data)
}

fn elementwise(a: &Constant, b: &Constant, op: impl Fn(f32, f32) -> f32) -> Option<Folded> {
    if a.dims == b.dims {
        let data = a.data.iter().zip(&b.data).map(|(&x, &y)| op(x, y)).collect();
        Some(Ok((a.dims.clone(), data)))
    } else if b.data.len() == 1 {
        let y = b.data[0];
        Some(Ok((a.dims.clone(), a.data.iter().map(|&x| op(x, y)).collect())))
    } else if a.data.len() == 1 {
        let x = a.data[0];
        Some(Ok((b.dims.clone(), b.data.iter().map(|&y| op(x, y)).collect())))
    } else {
        // General broadcasting is left to the runtime.
        None
    }
}

fn matmul(node: &Node, a: &Constant, b: &Constant) -> Folded {
    let (m, k) = (a.dims[0] as usize, a.dims[1] as usize);
    let (k2, n) = (b.dims[0] as usize, b.dims[1] as usize);
    if k != k2 {
        return Err(ExportError::Fold(format!(
            "{}: cannot multiply {:?} by {:?}",
            node.name, a.dims, b.dims
        )));
    }
    let mut data = vec![0.0; m * n];
    for i in 0..m {
        for j in 0..n {
            data[i * n + j] = (0..k).map(|p| a.data[i * k + p] * b.data[p * n + j]).sum();
        }
    }
    Ok((vec![m as i64, n as i64], data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onnx::graph::{Dim, ValueInfo};

    fn node(op: &str, inputs: &[&str], output: &str) -> Node {
        Node::new(
            format!("/{op}"),
            op,
            inputs.iter().map(|s| s.to_string()).collect(),
            vec![output.to_string()],
        )
    }

    fn graph(nodes: Vec<Node>, initializers: Vec<Constant>) -> Graph {
        Graph {
            name: "g".into(),
            inputs: vec![ValueInfo::float("x", vec![Dim::Symbolic("n".into()), Dim::Fixed(2)])],
            outputs: vec![ValueInfo::float("y", vec![Dim::Symbolic("n".into()), Dim::Fixed(3)])],
            nodes,
            initializers,
        }
    }

    #[test]
    fn transposed_weight_is_folded_into_an_initializer() {
        let mut g = graph(
            vec![
                node("Transpose", &["w"], "w_t"),
                node("MatMul", &["x", "w_t"], "y"),
            ],
            vec![Constant::new("w", vec![3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])],
        );

        assert_eq!(fold_constants(&mut g).unwrap(), 1);
        assert_eq!(g.nodes.len(), 1);
        assert_eq!(g.nodes[0].op_type, "MatMul");
        assert!(g.initializer("w").is_none());

        let w_t = g.initializer("w_t").unwrap();
        assert_eq!(w_t.dims, vec![2, 3]);
        assert_eq!(w_t.data, vec![1.0, 3.0, 5.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn chains_of_constant_nodes_collapse() {
        let mut g = graph(
            vec![
                node("Mul", &["a", "two"], "a2"),
                node("Add", &["a2", "one"], "b"),
                node("Identity", &["b"], "c"),
                node("Add", &["x", "c"], "y"),
            ],
            vec![
                Constant::new("a", vec![2], vec![1.0, 2.0]),
                Constant::new("two", vec![], vec![2.0]),
                Constant::new("one", vec![2], vec![1.0, 1.0]),
            ],
        );

        assert_eq!(fold_constants(&mut g).unwrap(), 3);
        assert_eq!(g.nodes.len(), 1);
        assert_eq!(g.initializers.len(), 1);
        assert_eq!(g.initializer("c").unwrap().data, vec![3.0, 5.0]);
    }

    #[test]
    fn nodes_reading_graph_inputs_are_kept() {
        let mut g = graph(
            vec![node("Gemm", &["x", "w", "b"], "y")],
            vec![
                Constant::new("w", vec![2, 3], vec![0.0; 6]),
                Constant::new("b", vec![3], vec![0.0; 3]),
            ],
        );
        let before = g.clone();

        assert_eq!(fold_constants(&mut g).unwrap(), 0);
        assert_eq!(g, before);
    }

    #[test]
    fn constant_matmul_is_evaluated() {
        let mut g = graph(
            vec![
                node("MatMul", &["a", "b"], "ab"),
                node("Add", &["x", "ab"], "y"),
            ],
            vec![
                Constant::new("a", vec![1, 2], vec![1.0, 2.0]),
                Constant::new("b", vec![2, 2], vec![3.0, 4.0, 5.0, 6.0]),
            ],
        );

        fold_constants(&mut g).unwrap();
        let ab = g.initializer("ab").unwrap();
        assert_eq!(ab.dims, vec![1, 2]);
        assert_eq!(ab.data, vec![13.0, 16.0]);
    }

    #[test]
    fn incompatible_matmul_is_an_error() {
        let mut g = graph(
            vec![
                node("MatMul", &["a", "b"], "ab"),
                node("Add", &["x", "ab"], "y"),
            ],
            vec![
                Constant::new("a", vec![1, 2], vec![1.0, 2.0]),
                Constant::new("b", vec![3, 1], vec![1.0, 1.0, 1.0]),
            ],
        );

        assert!(matches!(fold_constants(&mut g), Err(ExportError::Fold(_))));
    }
}
