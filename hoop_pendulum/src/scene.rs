//! # 场景适配层
//!
//! 把运动学核心的输出写入 Bevy 场景：
//!
//! - 启动时放置静态物体（地面、背景板、底座），再创建运动物体和弹簧
//! - 每次收到 [`FrameChanged`] 事件，从轨迹完整重算当前帧并更新 `Transform`
//! - 弹簧网格按螺距缓存，只在螺距变化时原地重写顶点缓冲
//!
//! 所有实体和资源句柄都保存在 [`HoopScene`] 中，不按名字查找。

use crate::config::Settings;
use crate::hoop::{
    pose_from_sample, BodyKind, HoopGeometry, Sample, SpringCache, SpringMesh, SpringParams,
    SpringSide, SpringSurface, StaticLayout, StaticPlacement, Trajectory,
};
use crate::playback::{
    advance_timeline, playback_controls, FrameChanged, FramePhase, Timeline,
};
use bevy::log::{debug, info};
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology, SphereKind, VertexAttributeValues};
use bevy::render::render_asset::RenderAssetUsages;
use std::f32::consts::FRAC_PI_2;

/// 圆环模型资源：几何常数 + 轨迹（加载后只读）
#[derive(Resource)]
pub struct HoopModel {
    pub geometry: HoopGeometry,
    pub trajectory: Trajectory,
}

/// 运动刚体的实体句柄
#[derive(Debug, Clone, Copy)]
pub struct BodyHandle {
    pub entity: Entity,
    /// Bevy 图元自身的基础旋转
    ///
    /// Bevy 的 Torus/Cylinder 默认沿Y轴，运动学约定物体轴沿Z轴，
    /// 先应用基础旋转再应用运动学姿态。
    pub base_rotation: Quat,
}

/// 一根弹簧的实体、网格和缓存
pub struct SpringSlot {
    pub entity: Entity,
    pub mesh: Handle<Mesh>,
    pub buffer: SpringMesh,
    pub cache: SpringCache,
}

/// 场景中所有运动物体的句柄
#[derive(Resource)]
pub struct HoopScene {
    pub hoop: BodyHandle,
    pub central_bar: BodyHandle,
    pub sphere_a: BodyHandle,
    pub sphere_b: BodyHandle,
    /// 按 [`SpringSide::ALL`] 的顺序；关闭弹簧时为 `None`
    pub springs: [Option<SpringSlot>; 2],
    pub spring_material: Handle<StandardMaterial>,
}

impl HoopScene {
    pub fn body(&self, kind: BodyKind) -> BodyHandle {
        match kind {
            BodyKind::Hoop => self.hoop,
            BodyKind::CentralBar => self.central_bar,
            BodyKind::SphereA => self.sphere_a,
            BodyKind::SphereB => self.sphere_b,
        }
    }

    pub fn springs_spawned(&self) -> bool {
        self.springs.iter().any(Option::is_some)
    }
}

fn spring_slot(side: SpringSide) -> usize {
    match side {
        SpringSide::First => 0,
        SpringSide::Second => 1,
    }
}

/// 圆环摆可视化插件
///
/// 使用前需要插入 [`HoopModel`]、[`Settings`] 和 [`Timeline`] 资源。
pub struct HoopPlugin {
    interactive: bool,
}

impl HoopPlugin {
    /// 带时间轴播放和键盘控制
    pub fn interactive() -> Self {
        Self { interactive: true }
    }

    /// 只响应外部发送的 [`FrameChanged`] 事件（用于测试）
    pub fn headless() -> Self {
        Self { interactive: false }
    }
}

impl Plugin for HoopPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<FrameChanged>()
            .init_resource::<FramePhase>()
            .add_systems(
                Startup,
                (place_static_geometry, spawn_moving_bodies, request_initial_frame).chain(),
            );

        if self.interactive {
            app.add_systems(
                Update,
                (
                    advance_timeline,
                    playback_controls,
                    toggle_springs,
                    apply_frame,
                )
                    .chain(),
            );
        } else {
            app.add_systems(Update, apply_frame);
        }
    }
}

/// 启动时创建的材质，供运动物体使用
#[derive(Resource)]
pub struct MaterialPalette(pub Vec<Handle<StandardMaterial>>);

/// 创建8个材质：前7个依次对应地面、背景板、底座、立柱、摆锤A、摆锤B、圆环，
/// 第8个由两根弹簧共用
fn make_materials(materials: &mut Assets<StandardMaterial>) -> Vec<Handle<StandardMaterial>> {
    let colors = [
        Color::srgb(0.35, 0.35, 0.38),
        Color::srgb(0.85, 0.85, 0.88),
        Color::srgb(0.25, 0.22, 0.2),
        Color::srgb(0.6, 0.6, 0.65),
        Color::srgb(0.8, 0.2, 0.15),
        Color::srgb(0.15, 0.35, 0.8),
        Color::srgb(0.7, 0.5, 0.3),
    ];

    let mut handles: Vec<_> = colors
        .into_iter()
        .map(|base_color| {
            materials.add(StandardMaterial {
                base_color,
                perceptual_roughness: 0.6,
                ..default()
            })
        })
        .collect();

    // 弹簧曲面的三角形朝向不固定，双面渲染
    handles.push(materials.add(StandardMaterial {
        base_color: Color::srgb(0.75, 0.75, 0.7),
        metallic: 0.8,
        perceptual_roughness: 0.3,
        double_sided: true,
        cull_mode: None,
        ..default()
    }));

    handles
}

fn uv_sphere(radius: f32) -> Mesh {
    Sphere::new(radius)
        .mesh()
        .kind(SphereKind::Uv {
            sectors: 50,
            stacks: 50,
        })
        .build()
}

fn placement_transform(placement: &StaticPlacement) -> Transform {
    Transform {
        translation: placement.position.as_vec3(),
        rotation: placement.orientation.as_quat(),
        scale: placement.scale.as_vec3(),
    }
}

/// 放置静态物体
///
/// 状态: `Uninitialized → StaticGeometryPlaced`
pub fn place_static_geometry(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut phase: ResMut<FramePhase>,
) {
    let layout = StaticLayout::default();
    let palette = make_materials(&mut materials);
    let half_size = layout.plane_half_size as f32;

    let plane = meshes.add(Plane3d::new(Vec3::Z, Vec2::splat(half_size)));

    commands.spawn((
        Name::new("ground"),
        Mesh3d(plane.clone()),
        MeshMaterial3d(palette[0].clone()),
        placement_transform(&layout.ground),
    ));
    commands.spawn((
        Name::new("backdrop"),
        Mesh3d(plane),
        MeshMaterial3d(palette[1].clone()),
        placement_transform(&layout.backdrop),
    ));
    commands.spawn((
        Name::new("base_block"),
        Mesh3d(meshes.add(Cuboid::new(2.0, 2.0, 2.0))),
        MeshMaterial3d(palette[2].clone()),
        placement_transform(&layout.base_block),
    ));

    commands.insert_resource(MaterialPalette(palette));
    *phase = FramePhase::StaticGeometryPlaced;
}

/// 创建运动物体和弹簧，并保存所有句柄
pub fn spawn_moving_bodies(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    palette: Res<MaterialPalette>,
    model: Res<HoopModel>,
    settings: Res<Settings>,
    timeline: Res<Timeline>,
) {
    let geometry = &model.geometry;
    let palette = &palette.0;
    let minor = geometry.minor_radius as f32;
    let axis_to_z = Quat::from_rotation_x(FRAC_PI_2);

    let mut spawn_body = |name: &'static str, mesh: Mesh, material: usize, base_rotation: Quat| {
        let entity = commands
            .spawn((
                Name::new(name),
                Mesh3d(meshes.add(mesh)),
                MeshMaterial3d(palette[material].clone()),
                Transform::from_rotation(base_rotation),
            ))
            .id();
        BodyHandle {
            entity,
            base_rotation,
        }
    };

    let central_bar = spawn_body(
        BodyKind::CentralBar.name(),
        Cylinder::new(minor, geometry.bar_depth as f32).mesh().build(),
        3,
        axis_to_z,
    );
    let sphere_radius = geometry.sphere_radius() as f32;
    let sphere_a = spawn_body(
        BodyKind::SphereA.name(),
        uv_sphere(sphere_radius),
        4,
        Quat::IDENTITY,
    );
    let sphere_b = spawn_body(
        BodyKind::SphereB.name(),
        uv_sphere(sphere_radius),
        5,
        Quat::IDENTITY,
    );
    let hoop = spawn_body(
        BodyKind::Hoop.name(),
        Torus {
            minor_radius: minor,
            major_radius: geometry.major_radius as f32,
        }
        .mesh()
        .major_resolution(300)
        .minor_resolution(30)
        .build(),
        6,
        axis_to_z,
    );

    let spring_material = palette[7].clone();
    let springs = if settings.springs_enabled {
        let sample = model.trajectory.sample(timeline.current());
        SpringSide::ALL.map(|side| {
            Some(spawn_spring(
                &mut commands,
                &mut meshes,
                &spring_material,
                side,
                geometry,
                &settings.spring,
                &sample,
            ))
        })
    } else {
        [None, None]
    };

    info!(
        "Hoop: R = {}, r = {}, m0 = {}, m1 = {}, k0 = {}, k1 = {}, g = {}",
        geometry.major_radius,
        geometry.minor_radius,
        geometry.m0,
        geometry.m1,
        geometry.k0,
        geometry.k1,
        geometry.gravity
    );
    let (first, last) = model.trajectory.time_span();
    info!(
        "Scene ready: {} frames, t = {:.3} .. {:.3} ({:.3}s), springs {}",
        model.trajectory.len(),
        first,
        last,
        model.trajectory.duration(),
        if settings.springs_enabled { "on" } else { "off" }
    );

    commands.insert_resource(HoopScene {
        hoop,
        central_bar,
        sphere_a,
        sphere_b,
        springs,
        spring_material,
    });
}

/// 启动时的首次渲染
///
/// 状态: `StaticGeometryPlaced → Frame(start)`
pub fn request_initial_frame(
    settings: Res<Settings>,
    mut timeline: ResMut<Timeline>,
    mut frames: EventWriter<FrameChanged>,
) {
    let start = timeline.seek(settings.start_frame);
    frames.send(FrameChanged(start));
}

/// 在当前帧的弹簧形状上创建弹簧实体
fn spawn_spring(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    material: &Handle<StandardMaterial>,
    side: SpringSide,
    geometry: &HoopGeometry,
    params: &SpringParams,
    sample: &Sample,
) -> SpringSlot {
    let surface = SpringSurface::new(side, geometry, params, sample);
    let buffer = SpringMesh::tessellate(&surface, params);
    let mut cache = SpringCache::new(params.height_tolerance);
    cache.needs_update(surface.height);

    debug!(
        "{}: {} vertices, {} triangles",
        side.name(),
        buffer.vertex_count(),
        buffer.triangle_count()
    );

    let mesh = meshes.add(spring_mesh_to_bevy(&buffer));
    let entity = commands
        .spawn((
            Name::new(side.name()),
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_rotation(Quat::from_rotation_z(sample.q2 as f32)),
        ))
        .id();

    SpringSlot {
        entity,
        mesh,
        buffer,
        cache,
    }
}

/// 删除弹簧实体和网格；实体已不存在时静默跳过
fn despawn_spring(commands: &mut Commands, meshes: &mut Assets<Mesh>, slot: SpringSlot) {
    if let Some(mut entity) = commands.get_entity(slot.entity) {
        entity.despawn();
    }
    meshes.remove(&slot.mesh);
}

/// 采样结果转换为 Bevy 网格
pub fn spring_mesh_to_bevy(buffer: &SpringMesh) -> Mesh {
    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, buffer.positions.clone())
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, buffer.normals.clone())
    .with_inserted_indices(Indices::U32(buffer.indices.clone()))
}

/// 原地重写 Bevy 网格的顶点位置和法向量
pub fn write_spring_mesh(buffer: &SpringMesh, mesh: &mut Mesh) {
    match mesh.attribute_mut(Mesh::ATTRIBUTE_POSITION) {
        Some(VertexAttributeValues::Float32x3(positions))
            if positions.len() == buffer.positions.len() =>
        {
            positions.copy_from_slice(&buffer.positions);
        }
        _ => mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, buffer.positions.clone()),
    }

    match mesh.attribute_mut(Mesh::ATTRIBUTE_NORMAL) {
        Some(VertexAttributeValues::Float32x3(normals))
            if normals.len() == buffer.normals.len() =>
        {
            normals.copy_from_slice(&buffer.normals);
        }
        _ => mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, buffer.normals.clone()),
    }
}

/// 帧更新：从轨迹重算第 n 帧并写入场景
///
/// 同一帧内收到多个事件时只处理最后一个。
/// 状态: `Frame(n) → Frame(n')`
pub fn apply_frame(
    mut frames: EventReader<FrameChanged>,
    model: Res<HoopModel>,
    settings: Res<Settings>,
    mut scene: ResMut<HoopScene>,
    mut transforms: Query<&mut Transform>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut phase: ResMut<FramePhase>,
) {
    let Some(&FrameChanged(requested)) = frames.read().last() else {
        return;
    };

    let n = model.trajectory.clamp_frame(requested);
    let sample = model.trajectory.sample(n);
    let pose = pose_from_sample(&model.geometry, &sample);

    for (kind, body_pose) in pose.iter() {
        let handle = scene.body(kind);
        if let Ok(mut transform) = transforms.get_mut(handle.entity) {
            transform.translation = body_pose.position.as_vec3();
            transform.rotation = body_pose.orientation.as_quat() * handle.base_rotation;
        }
    }

    // 网格中存的是进动前的曲面，进动由实体旋转完成
    let precession = Quat::from_rotation_z(sample.q2 as f32);
    for side in SpringSide::ALL {
        let Some(slot) = scene.springs[spring_slot(side)].as_mut() else {
            continue;
        };

        if let Ok(mut transform) = transforms.get_mut(slot.entity) {
            transform.rotation = precession;
        }

        let surface = SpringSurface::new(side, &model.geometry, &settings.spring, &sample);
        if slot.cache.needs_update(surface.height) {
            slot.buffer.resample(&surface);
            if let Some(mesh) = meshes.get_mut(&slot.mesh) {
                write_spring_mesh(&slot.buffer, mesh);
            }
        }
    }

    debug!("Frame {} (t = {:.4})", n, sample.t);
    *phase = FramePhase::Frame(n);
}

/// 按 S 键开关弹簧
///
/// 弹簧网格每帧重写代价较高，编辑场景时可以先关闭。
pub fn toggle_springs(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut scene: ResMut<HoopScene>,
    model: Res<HoopModel>,
    settings: Res<Settings>,
    timeline: Res<Timeline>,
) {
    if !keyboard.just_pressed(KeyCode::KeyS) {
        return;
    }

    if scene.springs_spawned() {
        for slot in scene.springs.iter_mut() {
            if let Some(slot) = slot.take() {
                despawn_spring(&mut commands, &mut meshes, slot);
            }
        }
        info!("Springs hidden");
    } else {
        let sample = model.trajectory.sample(timeline.current());
        let material = scene.spring_material.clone();
        for side in SpringSide::ALL {
            scene.springs[spring_slot(side)] = Some(spawn_spring(
                &mut commands,
                &mut meshes,
                &material,
                side,
                &model.geometry,
                &settings.spring,
                &sample,
            ));
        }
        info!("Springs shown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hoop::pose;

    const DATA: &str = "0.0 0.0 0.0 0.0\n\
                        0.1 0.2 1.5707963267948966 -0.1\n\
                        0.2 0.4 3.0 -0.2\n";

    /// 创建不带渲染的测试 App
    fn test_app(springs_enabled: bool) -> App {
        let trajectory = Trajectory::parse(DATA).unwrap();
        let settings = Settings {
            springs_enabled,
            spring: SpringParams {
                u_steps: 40,
                v_steps: 6,
                ..SpringParams::default()
            },
            ..Settings::default()
        };

        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(bevy::asset::AssetPlugin::default());
        app.init_resource::<Assets<Mesh>>();
        app.init_resource::<Assets<StandardMaterial>>();
        app.insert_resource(Timeline::new(trajectory.len(), settings.fps, true));
        app.insert_resource(settings);
        app.insert_resource(HoopModel {
            geometry: HoopGeometry::default(),
            trajectory,
        });
        app.add_plugins(HoopPlugin::headless());
        app
    }

    fn translation(app: &App, entity: Entity) -> Vec3 {
        app.world().get::<Transform>(entity).unwrap().translation
    }

    #[test]
    fn test_startup_renders_first_frame() {
        let mut app = test_app(false);
        app.update();

        assert_eq!(*app.world().resource::<FramePhase>(), FramePhase::Frame(0));

        let model = app.world().resource::<HoopModel>();
        let expected = pose(&model.geometry, &model.trajectory, 0);
        let scene = app.world().resource::<HoopScene>();
        let sphere_a = scene.sphere_a.entity;
        let hoop = scene.hoop.entity;
        assert!(!scene.springs_spawned());

        let actual = translation(&app, sphere_a);
        assert!((actual - expected.sphere_a.position.as_vec3()).length() < 1e-5);
        assert!((translation(&app, hoop) - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-6);
    }

    #[test]
    fn test_frame_change_updates_transforms() {
        let mut app = test_app(false);
        app.update();

        app.world_mut().send_event(FrameChanged(1));
        app.update();

        assert_eq!(*app.world().resource::<FramePhase>(), FramePhase::Frame(1));

        let model = app.world().resource::<HoopModel>();
        let expected = pose(&model.geometry, &model.trajectory, 1);
        let scene = app.world().resource::<HoopScene>();
        let entities = BodyKind::ALL.map(|kind| (kind, scene.body(kind).entity));

        for (kind, entity) in entities {
            let actual = translation(&app, entity);
            let wanted = expected.get(kind).position.as_vec3();
            assert!(
                (actual - wanted).length() < 1e-5,
                "{}: {actual:?} != {wanted:?}",
                kind.name()
            );
        }

        // 立柱的Y轴图元经基础旋转后沿世界Z轴
        let bar = scene.central_bar.entity;
        let rotation = app.world().get::<Transform>(bar).unwrap().rotation;
        assert!((rotation * Vec3::Y - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_out_of_range_frame_is_clamped() {
        let mut app = test_app(false);
        app.update();

        app.world_mut().send_event(FrameChanged(1000));
        app.update();

        assert_eq!(*app.world().resource::<FramePhase>(), FramePhase::Frame(2));
    }

    #[test]
    fn test_spring_mesh_follows_frame() {
        let mut app = test_app(true);
        app.update();

        let (mesh_handle, entity) = {
            let scene = app.world().resource::<HoopScene>();
            let slot = scene.springs[0].as_ref().unwrap();
            (slot.mesh.clone(), slot.entity)
        };

        let positions = |app: &App| -> Vec<[f32; 3]> {
            let mesh = app
                .world()
                .resource::<Assets<Mesh>>()
                .get(&mesh_handle)
                .unwrap();
            match mesh.attribute(Mesh::ATTRIBUTE_POSITION) {
                Some(VertexAttributeValues::Float32x3(positions)) => positions.clone(),
                _ => panic!("spring mesh has no positions"),
            }
        };

        let before = positions(&app);
        app.world_mut().send_event(FrameChanged(1));
        app.update();
        let after = positions(&app);

        assert_eq!(before.len(), after.len());
        assert_ne!(before, after);

        // 网格与直接采样的曲面一致
        let model = app.world().resource::<HoopModel>();
        let settings = app.world().resource::<Settings>();
        let sample = model.trajectory.sample(1);
        let surface =
            SpringSurface::new(SpringSide::First, &model.geometry, &settings.spring, &sample);
        let expected = SpringMesh::tessellate(&surface, &settings.spring);
        assert_eq!(after, expected.positions);

        // 进动由实体旋转完成
        let rotation = app.world().get::<Transform>(entity).unwrap().rotation;
        let expected_rotation = Quat::from_rotation_z(sample.q2 as f32);
        assert!(rotation.angle_between(expected_rotation) < 1e-5);
    }

    fn press_spring_key(app: &mut App) {
        let mut keyboard = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
        keyboard.release(KeyCode::KeyS);
        keyboard.clear();
        keyboard.press(KeyCode::KeyS);
        app.update();
    }

    #[test]
    fn test_toggle_springs_tolerates_missing_entity() {
        let mut app = test_app(true);
        app.init_resource::<ButtonInput<KeyCode>>();
        app.add_systems(Update, toggle_springs.before(apply_frame));
        app.update();

        let (old_entities, old_meshes) = {
            let scene = app.world().resource::<HoopScene>();
            let slots: Vec<&SpringSlot> = scene.springs.iter().flatten().collect();
            assert_eq!(slots.len(), 2);
            (
                slots.iter().map(|slot| slot.entity).collect::<Vec<_>>(),
                slots.iter().map(|slot| slot.mesh.clone()).collect::<Vec<_>>(),
            )
        };

        // 外部已经删掉了一根弹簧
        assert!(app.world_mut().despawn(old_entities[0]));

        press_spring_key(&mut app);

        assert!(!app.world().resource::<HoopScene>().springs_spawned());
        assert!(!app.world().entities().contains(old_entities[1]));
        let meshes = app.world().resource::<Assets<Mesh>>();
        for handle in &old_meshes {
            assert!(meshes.get(handle).is_none());
        }

        press_spring_key(&mut app);

        let scene = app.world().resource::<HoopScene>();
        let slots: Vec<&SpringSlot> = scene.springs.iter().flatten().collect();
        assert_eq!(slots.len(), 2);
        let meshes = app.world().resource::<Assets<Mesh>>();
        for slot in slots {
            assert!(!old_entities.contains(&slot.entity));
            assert!(app.world().entities().contains(slot.entity));
            let mesh = meshes.get(&slot.mesh).unwrap();
            assert_eq!(mesh.count_vertices(), slot.buffer.vertex_count());
        }
    }

    #[test]
    fn test_write_spring_mesh_in_place() {
        let geometry = HoopGeometry::default();
        let params = SpringParams {
            u_steps: 10,
            v_steps: 4,
            ..SpringParams::default()
        };
        let first = Sample {
            t: 0.0,
            q1: 0.0,
            q2: 0.0,
            q3: 0.0,
        };
        let second = Sample { q1: 0.3, ..first };

        let mut buffer = SpringMesh::tessellate(
            &SpringSurface::new(SpringSide::First, &geometry, &params, &first),
            &params,
        );
        let mut mesh = spring_mesh_to_bevy(&buffer);
        assert_eq!(mesh.count_vertices(), buffer.vertex_count());

        buffer.resample(&SpringSurface::new(
            SpringSide::First,
            &geometry,
            &params,
            &second,
        ));
        write_spring_mesh(&buffer, &mut mesh);

        match mesh.attribute(Mesh::ATTRIBUTE_POSITION) {
            Some(VertexAttributeValues::Float32x3(positions)) => {
                assert_eq!(positions, &buffer.positions);
            }
            _ => panic!("spring mesh has no positions"),
        }
    }
}
