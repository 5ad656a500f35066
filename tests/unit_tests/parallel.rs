use levelset_assembly::assembly::boundary::BoundaryVectorAssemblerBuilder;
use levelset_assembly::assembly::parallel::{
    par_assemble_boundary_vector, par_assemble_boundary_vector_cloned, partition_mesh,
};
use levelset_assembly::expression::Expression;
use levelset_assembly::levelset::NodalLevelSet;
use levelset_assembly::mesh::procedural::{create_unit_box_uniform_tet_mesh_3d, markers};
use levelset_assembly::mesh::BoundaryMesh;
use levelset_assembly::quadrature::adapter::LevelSetFaceQuadratureAdapter;
use levelset_assembly::quadrature::FaceQuadrature;
use levelset_assembly::space::{FiniteElementSpace, LagrangeSpace};
use matrixcompare::assert_matrix_eq;
use nalgebra::{DVector, Point3, Vector3};

#[test]
fn partitions_cover_boundary_faces_once() {
    let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(2);
    for num_partitions in [1, 3, 7, 100] {
        let partitions = partition_mesh(&mesh, num_partitions).unwrap();
        assert!(partitions.len() <= num_partitions);

        let mut elements: Vec<_> = partitions.iter().flat_map(|p| p.elements().to_vec()).collect();
        elements.sort_unstable();
        assert!(elements.iter().copied().eq(0..mesh.num_elements()));

        let mut faces: Vec<_> = partitions
            .iter()
            .flat_map(|p| p.boundary_faces().to_vec())
            .collect();
        faces.sort_unstable();
        assert!(faces.iter().copied().eq(0..mesh.num_boundary_faces()));

        for partition in &partitions {
            for &face in partition.boundary_faces() {
                let element = mesh.boundary_face(face).unwrap().adjacent_element();
                assert!(partition.elements().contains(&element));
            }
        }
    }
}

#[test]
fn parallel_assembly_matches_sequential_assembly() {
    let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(3);
    let space = LagrangeSpace::new(&mesh, 2, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| (x - Point3::new(0.5, 0.5, 0.0)).norm() - 0.4).unwrap();
    let base = FaceQuadrature::triangle(4).unwrap();
    let integrand = || Expression::function(|x: &Point3<f64>| 1.0 + x.x * x.y) * Expression::phi_i();

    let mut sequential = BoundaryVectorAssemblerBuilder::new()
        .with_mesh(&mesh)
        .with_boundary_marker(markers::NEGATIVE_Z)
        .with_quadrature_adapter(LevelSetFaceQuadratureAdapter::new(level_set.clone(), base.clone()))
        .with_test_space(&space)
        .with_expression(integrand())
        .build()
        .unwrap();
    let mut expected = DVector::zeros(space.num_total_dofs());
    sequential.add_to(&mut expected).unwrap();

    let partitions = partition_mesh(&mesh, 4).unwrap();
    let result = par_assemble_boundary_vector(
        &partitions,
        |partition| {
            // Each partition only needs level-set data for its own elements
            let local_level_set = level_set.restrict_to_elements(partition.elements());
            BoundaryVectorAssemblerBuilder::new()
                .with_mesh(&mesh)
                .with_boundary_marker(markers::NEGATIVE_Z)
                .with_quadrature_adapter(LevelSetFaceQuadratureAdapter::new(local_level_set, base.clone()))
                .with_test_space(&space)
                .with_expression(integrand())
                .build()
        },
        space.num_total_dofs(),
    )
    .unwrap();

    assert_matrix_eq!(result, expected, comp = abs, tol = 1e-14);
}

#[test]
fn parallel_assembly_with_cloned_assembler() {
    let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(3);
    let space = LagrangeSpace::new(&mesh, 1, 3).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| x.x + 0.5 * x.y - 0.6).unwrap();
    let traction = Expression::vector(Vector3::new(1.0, -2.0, 0.5));
    let mut assembler = BoundaryVectorAssemblerBuilder::new()
        .with_mesh(&mesh)
        .with_boundary_marker(markers::POSITIVE_Z)
        .with_quadrature_adapter(LevelSetFaceQuadratureAdapter::new(
            level_set,
            FaceQuadrature::triangle(3).unwrap(),
        ))
        .with_test_space(&space)
        .with_expression(Expression::dot(traction, Expression::phi_i()))
        .build()
        .unwrap();

    let mut expected = DVector::zeros(space.num_total_dofs());
    assembler.add_to(&mut expected).unwrap();

    let partitions = partition_mesh(&mesh, 3).unwrap();
    let result = par_assemble_boundary_vector_cloned(&assembler, &partitions).unwrap();
    assert_matrix_eq!(result, expected, comp = abs, tol = 1e-14);
}

#[test]
fn parallel_assembly_propagates_errors() {
    let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(2);
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| x.x - 0.5).unwrap();
    let partitions = partition_mesh(&mesh, 2).unwrap();

    // Level-set data restricted to the wrong elements
    let result = par_assemble_boundary_vector(
        &partitions,
        |_| {
            BoundaryVectorAssemblerBuilder::new()
                .with_mesh(&mesh)
                .with_boundary_marker(markers::POSITIVE_Y)
                .with_quadrature_adapter(LevelSetFaceQuadratureAdapter::new(
                    level_set.restrict_to_elements(&[]),
                    FaceQuadrature::triangle(1)?,
                ))
                .with_test_space(&space)
                .with_expression(Expression::phi_i())
                .build()
        },
        space.num_total_dofs(),
    );
    assert!(result.is_err());
}
