use crate::unit_tet_mesh;
use levelset_assembly::connectivity::TET4_LOCAL_EDGES;
use levelset_assembly::element::TetrahedralLagrange;
use levelset_assembly::mesh::procedural::create_unit_box_uniform_tet_mesh_3d;
use levelset_assembly::mesh::BoundaryMesh;
use levelset_assembly::space::{FiniteElementSpace, LagrangeSpace};
use std::collections::HashMap;

#[test]
fn linear_space_uses_mesh_vertices() {
    let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(2);
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    assert_eq!(space.degree(), 1);
    assert_eq!(space.reference_element(), TetrahedralLagrange::Linear);
    assert_eq!(space.num_nodes(), 27);
    assert_eq!(space.num_elements(), 48);
    assert_eq!(space.element_node_count(), 4);
    for e in 0..mesh.num_elements() {
        let conn = mesh.element_connectivity(e).unwrap();
        assert_eq!(space.element_nodes(e), &conn.0);
        for i in 0..4 {
            assert_eq!(space.local_to_global(e, i), conn[i]);
        }
    }
}

#[test]
fn quadratic_space_on_single_cube() {
    let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(1);
    let space = LagrangeSpace::new(&mesh, 2, 3).unwrap();
    // 8 vertices, 12 cube edges, 6 face diagonals and 1 body diagonal
    assert_eq!(space.num_nodes(), 27);
    assert_eq!(space.element_node_count(), 10);
    assert_eq!(space.num_total_dofs(), 81);
}

#[test]
fn quadratic_edge_nodes_are_shared() {
    let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(2);
    let space = LagrangeSpace::new(&mesh, 2, 1).unwrap();
    let mut edge_nodes = HashMap::new();
    for e in 0..mesh.num_elements() {
        let conn = mesh.element_connectivity(e).unwrap();
        let nodes = space.element_nodes(e);
        assert_eq!(&nodes[..4], &conn.0);
        for (k, [a, b]) in TET4_LOCAL_EDGES.iter().enumerate() {
            let key = (conn[*a].min(conn[*b]), conn[*a].max(conn[*b]));
            let node = nodes[4 + k];
            assert!(node >= mesh.num_vertices());
            assert_eq!(*edge_nodes.entry(key).or_insert(node), node);
        }
    }
    assert_eq!(space.num_nodes(), mesh.num_vertices() + edge_nodes.len());
    // Edge nodes are numbered contiguously after the vertices
    let mut indices: Vec<_> = edge_nodes.values().copied().collect();
    indices.sort_unstable();
    assert!(indices.iter().copied().eq(mesh.num_vertices()..space.num_nodes()));
}

#[test]
fn invalid_space_parameters_are_rejected() {
    let mesh = unit_tet_mesh();
    assert!(LagrangeSpace::new(&mesh, 0, 1).is_err());
    assert!(LagrangeSpace::new(&mesh, 3, 1).is_err());
    assert!(LagrangeSpace::new(&mesh, 1, 0).is_err());
}

#[test]
fn space_through_reference() {
    let mesh = unit_tet_mesh();
    let space = LagrangeSpace::new(&mesh, 2, 2).unwrap();
    let by_reference = &space;
    assert_eq!(by_reference.num_total_dofs(), 20);
    assert_eq!(by_reference.local_to_global(0, 9), space.local_to_global(0, 9));
}
