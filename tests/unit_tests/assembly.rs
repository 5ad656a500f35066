use crate::{triangle_area, unit_tet_mesh};
use levelset_assembly::assembly::boundary::{
    AssemblerState, BoundaryVectorAssembler, BoundaryVectorAssemblerBuilder, PassStatistics,
};
use levelset_assembly::expression::Expression;
use levelset_assembly::levelset::NodalLevelSet;
use levelset_assembly::mesh::procedural::{create_unit_box_uniform_tet_mesh_3d, markers};
use levelset_assembly::mesh::{BoundaryMesh, Tet4Mesh};
use levelset_assembly::quadrature::adapter::{
    AdapterSettings, IntegrationRegion, LevelSetFaceQuadratureAdapter, MissingLevelSetPolicy,
};
use levelset_assembly::quadrature::FaceQuadrature;
use levelset_assembly::space::{FiniteElementSpace, LagrangeSpace};
use levelset_assembly::BoundaryMarker;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DVector, Point3};
use proptest::prelude::*;
use util::{assert_approx_matrix_eq, nonzero_indices};

type Assembler<'a> = BoundaryVectorAssembler<f64, &'a Tet4Mesh<f64>, NodalLevelSet<f64>, &'a LagrangeSpace>;

/// The unit tet with local face 0, which lies in the plane z = 0, marked with 7.
fn marked_unit_tet_mesh() -> Tet4Mesh<f64> {
    let mut mesh = unit_tet_mesh();
    mesh.set_boundary_marker(0, 7).unwrap();
    mesh
}

fn build_assembler<'a>(
    mesh: &'a Tet4Mesh<f64>,
    space: &'a LagrangeSpace,
    marker: BoundaryMarker,
    level_set: NodalLevelSet<f64>,
    settings: AdapterSettings,
    expression: Expression<f64>,
) -> Assembler<'a> {
    let base = FaceQuadrature::triangle(2).unwrap();
    BoundaryVectorAssemblerBuilder::new()
        .with_mesh(mesh)
        .with_boundary_marker(marker)
        .with_quadrature_adapter(LevelSetFaceQuadratureAdapter::with_settings(level_set, base, settings))
        .with_test_space(space)
        .with_expression(expression)
        .build()
        .unwrap()
}

fn assemble(assembler: &mut Assembler) -> DVector<f64> {
    let mut vector = DVector::zeros(assembler.test_space().num_total_dofs());
    assembler.add_to(&mut vector).unwrap();
    vector
}

fn region(region: IntegrationRegion) -> AdapterSettings {
    AdapterSettings {
        region,
        ..AdapterSettings::default()
    }
}

#[test]
fn linear_basis_on_single_face() {
    let mesh = marked_unit_tet_mesh();
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| 1.0 + x.x).unwrap();
    let mut assembler = build_assembler(
        &mesh,
        &space,
        7,
        level_set,
        AdapterSettings::default(),
        Expression::phi_i(),
    );
    assert_eq!(assembler.state(), AssemblerState::Constructed);

    let vector = assemble(&mut assembler);
    let expected = DVector::from_column_slice(&[1.0 / 6.0, 1.0 / 6.0, 1.0 / 6.0, 0.0]);
    assert_matrix_eq!(vector, expected, comp = abs, tol = 1e-15);
    assert_eq!(assembler.state(), AssemblerState::Idle);
    assert_eq!(
        assembler.last_pass_statistics(),
        PassStatistics {
            faces_visited: 4,
            faces_assembled: 1,
            quadrature_points: 3,
        }
    );
}

#[test]
fn uncut_faces_match_direct_integration_with_base_rule() {
    let mesh = marked_unit_tet_mesh();
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| 1.0 + x.x).unwrap();
    let integrand = Expression::function(|x: &Point3<f64>| x.x) * Expression::phi_i();
    let mut assembler = build_assembler(&mesh, &space, 7, level_set, AdapterSettings::default(), integrand);
    let vector = assemble(&mut assembler);

    // Exact values of the integrals of x * phi_i over the face, which the base rule integrates exactly
    let expected = DVector::from_column_slice(&[1.0 / 24.0, 1.0 / 12.0, 1.0 / 24.0, 0.0]);
    assert_matrix_eq!(vector, expected, comp = abs, tol = 1e-15);

    let adapter = assembler.quadrature_adapter();
    assert_eq!(adapter.adapted_face_quadrature(0).id(), adapter.base_quadrature().id());
}

#[test]
fn cut_faces_integrate_both_sides() {
    let mesh = marked_unit_tet_mesh();
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| x.x - 0.5).unwrap();
    let integrand = || Expression::function(|x: &Point3<f64>| x.x) * Expression::phi_i();

    let mut both = build_assembler(
        &mesh,
        &space,
        7,
        level_set.clone(),
        region(IntegrationRegion::Both),
        integrand(),
    );
    let mut negative = build_assembler(
        &mesh,
        &space,
        7,
        level_set.clone(),
        region(IntegrationRegion::Negative),
        integrand(),
    );
    let mut positive = build_assembler(&mesh, &space, 7, level_set, region(IntegrationRegion::Positive), integrand());

    let whole = assemble(&mut both);
    assert!(both.quadrature_adapter().is_cut(0));
    let expected = DVector::from_column_slice(&[1.0 / 24.0, 1.0 / 12.0, 1.0 / 24.0, 0.0]);
    assert_matrix_eq!(whole, expected, comp = abs, tol = 1e-14);

    let parts = assemble(&mut negative) + assemble(&mut positive);
    assert_matrix_eq!(parts, whole, comp = abs, tol = 1e-14);
}

#[test]
fn negative_region_of_cut_face() {
    let mesh = marked_unit_tet_mesh();
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| x.x - 0.5).unwrap();
    let mut assembler = build_assembler(
        &mesh,
        &space,
        7,
        level_set,
        region(IntegrationRegion::Negative),
        Expression::phi_i(),
    );
    let vector = assemble(&mut assembler);
    // The part x < 0.5 of the triangle with vertices (0, 0), (1, 0), (0, 1) has area 3/8
    assert_scalar_eq!(vector.sum(), 3.0 / 8.0, comp = abs, tol = 1e-14);
    assert_eq!(vector[3], 0.0);
}

#[test]
fn empty_adapted_rule_contributes_zero() {
    let mesh = marked_unit_tet_mesh();
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| 1.0 + x.x).unwrap();
    let mut assembler = build_assembler(
        &mesh,
        &space,
        7,
        level_set,
        region(IntegrationRegion::Negative),
        Expression::phi_i(),
    );

    let mut vector = DVector::from_element(4, 1.0);
    assembler.add_to(&mut vector).unwrap();
    assert_eq!(vector, DVector::from_element(4, 1.0));
    let statistics = assembler.last_pass_statistics();
    assert_eq!(statistics.faces_assembled, 1);
    assert_eq!(statistics.quadrature_points, 0);
    assert!(assembler.elemental_vector().values().iter().all(|&v| v == 0.0));
}

#[test]
fn degenerate_slivers_contribute_zero() {
    let mut mesh = unit_tet_mesh();
    mesh.mark_boundary_faces(|_| Some(7));
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    // The negative part of every face touching vertex 1 is a sliver of relative area 1e-8
    let level_set = NodalLevelSet::from_vertex_values(&mesh, vec![1.0, -1e-4, 1.0, 1.0]).unwrap();
    let settings = |degenerate_tolerance| AdapterSettings {
        region: IntegrationRegion::Negative,
        degenerate_tolerance,
        ..AdapterSettings::default()
    };

    let mut assembler = build_assembler(
        &mesh,
        &space,
        7,
        level_set.clone(),
        settings(1e-12),
        Expression::phi_i(),
    );
    let vector = assemble(&mut assembler);
    assert!(nonzero_indices(&vector).contains(&1));
    assert!(assembler.last_pass_statistics().quadrature_points > 0);

    let mut assembler = build_assembler(&mesh, &space, 7, level_set, settings(1e-6), Expression::phi_i());
    let vector = assemble(&mut assembler);
    assert!(nonzero_indices(&vector).is_empty());
    let statistics = assembler.last_pass_statistics();
    assert_eq!(statistics.faces_assembled, 4);
    assert_eq!(statistics.quadrature_points, 0);
}

#[test]
fn faces_without_marker_are_skipped() {
    let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(2);
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| x.y - 0.3).unwrap();
    let mut assembler = build_assembler(
        &mesh,
        &space,
        99,
        level_set,
        AdapterSettings::default(),
        Expression::phi_i(),
    );
    let vector = assemble(&mut assembler);
    assert!(nonzero_indices(&vector).is_empty());
    let statistics = assembler.last_pass_statistics();
    assert_eq!(statistics.faces_visited, mesh.num_boundary_faces());
    assert_eq!(statistics.faces_assembled, 0);
}

#[test]
fn repeated_passes_accumulate() {
    let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(2);
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| x.y - 0.3).unwrap();
    let integrand = Expression::function(|x: &Point3<f64>| 1.0 + x.y * x.z) * Expression::phi_i();
    let mut assembler = build_assembler(
        &mesh,
        &space,
        markers::NEGATIVE_X,
        level_set,
        AdapterSettings::default(),
        integrand,
    );

    let once = assemble(&mut assembler);
    let mut twice = DVector::zeros(once.len());
    assembler.add_to(&mut twice).unwrap();
    assembler.add_to(&mut twice).unwrap();
    assert_approx_matrix_eq!(twice, &once * 2.0, abstol = 1e-14);
}

#[test]
fn cloned_assembler_matches_source_after_a_pass() {
    let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(2);
    let space = LagrangeSpace::new(&mesh, 2, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| x.y + x.z - 0.7).unwrap();
    let integrand = Expression::function(|x: &Point3<f64>| 1.0 + x.y) * Expression::phi_i();
    let mut assembler = build_assembler(
        &mesh,
        &space,
        markers::NEGATIVE_X,
        level_set,
        region(IntegrationRegion::Positive),
        integrand,
    );

    let expected = assemble(&mut assembler);
    assert_eq!(assembler.state(), AssemblerState::Idle);

    let mut clone = assembler.clone();
    assert_eq!(clone.state(), AssemblerState::Constructed);
    assert_eq!(clone.marker(), assembler.marker());
    assert_eq!(clone.last_pass_statistics(), PassStatistics::default());
    assert_eq!(clone.quadrature_adapter().current_element(), None);
    assert_eq!(
        clone.quadrature_adapter().base_quadrature().id(),
        assembler.quadrature_adapter().base_quadrature().id()
    );

    let result = assemble(&mut clone);
    assert_matrix_eq!(result, expected, comp = abs, tol = 1e-15);
    assert_eq!(clone.last_pass_statistics(), assembler.last_pass_statistics());

    // The source is unaffected by passes of the clone
    let again = assemble(&mut assembler);
    assert_matrix_eq!(again, expected, comp = abs, tol = 1e-15);
}

#[test]
fn each_face_contributes_integrand_times_area() {
    let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(2);
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| x.z - 0.6).unwrap();
    let mut assembler = build_assembler(
        &mesh,
        &space,
        markers::POSITIVE_Y,
        level_set,
        AdapterSettings::default(),
        Expression::constant(3.0),
    );

    let faces = mesh.find_marked_boundary_faces(markers::POSITIVE_Y);
    assert_eq!(faces.len(), 8);
    let mut vector = DVector::zeros(space.num_total_dofs());
    // Visit the faces in reverse order, one at a time
    for &face_index in faces.iter().rev() {
        assembler.add_to_faces([face_index], &mut vector).unwrap();
        let face = mesh.boundary_face(face_index).unwrap();
        let area = triangle_area(&face.connectivity().0.map(|v| mesh.vertices()[v]));
        for &value in assembler.elemental_vector().values() {
            assert_scalar_eq!(value, 3.0 * area, comp = abs, tol = 1e-14);
        }
        let element_nodes = space.element_nodes(face.adjacent_element());
        assert_eq!(assembler.elemental_vector().row_indices(), element_nodes);
    }
    // Every face adds its area times the constant to each of its four element nodes
    assert_scalar_eq!(vector.sum(), 4.0 * 3.0, comp = abs, tol = 1e-13);
}

#[test]
fn vector_valued_traction() {
    let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(1);
    let space = LagrangeSpace::new(&mesh, 2, 3).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| x.y + x.z - 0.7).unwrap();
    let traction = Expression::dot(Expression::phi_i(), Expression::normal());
    let mut assembler = build_assembler(
        &mesh,
        &space,
        markers::NEGATIVE_X,
        level_set,
        AdapterSettings::default(),
        traction,
    );
    let vector = assemble(&mut assembler);

    // The normal of the side x = 0 is (-1, 0, 0), and the quadratic basis sums to one
    let n = space.num_nodes();
    assert_eq!(vector.len(), 3 * n);
    assert_scalar_eq!(vector.rows(0, n).sum(), -1.0, comp = abs, tol = 1e-13);
    assert_scalar_eq!(vector.rows(n, n).amax(), 0.0, comp = abs, tol = 1e-15);
    assert_scalar_eq!(vector.rows(2 * n, n).amax(), 0.0, comp = abs, tol = 1e-15);
}

#[test]
fn missing_level_set_data() {
    let mesh = marked_unit_tet_mesh();
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| x.x - 0.5)
        .unwrap()
        .restrict_to_elements(&[]);

    let mut failing = build_assembler(
        &mesh,
        &space,
        7,
        level_set.clone(),
        AdapterSettings::default(),
        Expression::phi_i(),
    );
    let mut vector = DVector::zeros(4);
    assert!(failing.add_to(&mut vector).is_err());
    assert_eq!(failing.state(), AssemblerState::Idle);

    let settings = AdapterSettings {
        missing_level_set: MissingLevelSetPolicy::TreatAsUncut,
        ..AdapterSettings::default()
    };
    let mut fallback = build_assembler(&mesh, &space, 7, level_set, settings, Expression::phi_i());
    let vector = assemble(&mut fallback);
    assert_scalar_eq!(vector.sum(), 0.5, comp = abs, tol = 1e-15);
}

#[test]
fn global_vector_must_match_test_space() {
    let mesh = marked_unit_tet_mesh();
    let space = LagrangeSpace::new(&mesh, 1, 2).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| 1.0 + x.x).unwrap();
    let integrand = Expression::dot(Expression::phi_i(), Expression::normal());
    let mut assembler = build_assembler(&mesh, &space, 7, level_set, AdapterSettings::default(), integrand);
    let mut vector = DVector::zeros(4);
    assert!(assembler.add_to(&mut vector).is_err());
    assert_eq!(assembler.state(), AssemblerState::Constructed);
}

#[test]
fn assembly_into_plain_vectors() {
    let mesh = marked_unit_tet_mesh();
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| 1.0 + x.x).unwrap();
    let mut assembler = build_assembler(
        &mesh,
        &space,
        7,
        level_set,
        AdapterSettings::default(),
        Expression::phi_i(),
    );
    let mut vector = vec![0.0; 4];
    assembler.add_to(&mut vector).unwrap();
    assert_scalar_eq!(vector[1], 1.0 / 6.0, comp = abs, tol = 1e-15);
}

#[test]
fn build_validates_configuration() {
    let mesh = marked_unit_tet_mesh();
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| 1.0 + x.x).unwrap();
    let base = FaceQuadrature::triangle(1).unwrap();

    let missing_marker = BoundaryVectorAssemblerBuilder::new()
        .with_mesh(&mesh)
        .with_quadrature_adapter(LevelSetFaceQuadratureAdapter::new(level_set.clone(), base.clone()))
        .with_test_space(&space)
        .with_expression(Expression::phi_i())
        .build();
    assert!(missing_marker.is_err());

    let vector_integrand = BoundaryVectorAssemblerBuilder::new()
        .with_mesh(&mesh)
        .with_boundary_marker(7)
        .with_quadrature_adapter(LevelSetFaceQuadratureAdapter::new(level_set.clone(), base.clone()))
        .with_test_space(&space)
        .with_expression(Expression::normal())
        .build();
    assert!(vector_integrand.is_err());

    let other_mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(1);
    let other_space = LagrangeSpace::new(&other_mesh, 1, 1).unwrap();
    let mismatched_space = BoundaryVectorAssemblerBuilder::new()
        .with_mesh(&mesh)
        .with_boundary_marker(7)
        .with_quadrature_adapter(LevelSetFaceQuadratureAdapter::new(level_set, base))
        .with_test_space(&other_space)
        .with_expression(Expression::phi_i())
        .build();
    assert!(mismatched_space.is_err());
}

#[test]
fn check_reports_evaluation_and_elemental_vector() {
    let mesh = marked_unit_tet_mesh();
    let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
    let level_set = NodalLevelSet::interpolate(&mesh, |x| 1.0 + x.x).unwrap();
    let mut assembler = build_assembler(
        &mesh,
        &space,
        7,
        level_set,
        AdapterSettings::default(),
        Expression::phi_i(),
    );

    // Right after construction, every face slot is bound to the base rule
    let mut output = Vec::new();
    assembler.check(&mut output).unwrap();
    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("state constructed"));
    for slot in 0..4 {
        assert!(output.contains(&format!("face slot {slot}: QuadratureId")));
    }
    assert!(output.contains("with 3 quadrature points, 4 basis functions"));

    assemble(&mut assembler);

    let mut output = Vec::new();
    assembler.check(&mut output).unwrap();
    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("marker 7"));
    assert!(output.contains("state idle"));
    assert!(output.contains("phi_i"));
    assert!(output.contains("ElementalVector"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]
    #[test]
    fn side_integrals_only_touch_side_nodes(
        marker in 1u32..=6,
        offset in -0.2..1.2f64,
    ) {
        let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(2);
        let space = LagrangeSpace::new(&mesh, 1, 1).unwrap();
        let level_set = NodalLevelSet::interpolate(&mesh, |x| x.x + x.y + x.z - 1.5 * offset).unwrap();
        let vectors: Vec<_> = [IntegrationRegion::Both, IntegrationRegion::Negative, IntegrationRegion::Positive]
            .into_iter()
            .map(|r| {
                let mut assembler =
                    build_assembler(&mesh, &space, marker, level_set.clone(), region(r), Expression::phi_i());
                assemble(&mut assembler)
            })
            .collect();

        // Nodes off the side have basis functions that vanish on it
        let (axis, value) = match marker {
            markers::NEGATIVE_X => (0, 0.0),
            markers::POSITIVE_X => (0, 1.0),
            markers::NEGATIVE_Y => (1, 0.0),
            markers::POSITIVE_Y => (1, 1.0),
            markers::NEGATIVE_Z => (2, 0.0),
            _ => (2, 1.0),
        };
        let on_side = |v: usize| mesh.vertices()[v][axis] == value;
        for vector in &vectors {
            for i in nonzero_indices(vector) {
                prop_assert!(on_side(i) || vector[i].abs() < 1e-15);
            }
        }

        // The whole side has area one
        prop_assert!((vectors[0].sum() - 1.0).abs() < 1e-12);
        let parts = &vectors[1] + &vectors[2];
        prop_assert!((&parts - &vectors[0]).amax() < 1e-12);
    }
}
