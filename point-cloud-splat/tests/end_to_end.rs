use approx::assert_abs_diff_eq;
use bevy::math::{Affine3A, Vec3, Vec4};
use point_cloud_splat::{
    DistanceHue, DistanceHueParams, PointCloudFrame, PointCloudInstance, SoftwareCompositor,
    SplatView, UniformColor, resolve_target,
};

const SIZE: u32 = 31;

fn front_view() -> SplatView {
    SplatView::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 0.8, 1.0)
}

#[test]
fn single_white_splat_covers_centre_only() {
    let compositor = SoftwareCompositor::new(SIZE, SIZE, 4).unwrap();
    let frame = PointCloudFrame::new()
        .with_instance(PointCloudInstance::default(), vec![Vec4::new(0.0, 0.0, 0.0, 1.0)]);

    let resolved = compositor
        .render(&front_view(), &frame, &UniformColor::default())
        .unwrap();

    let centre = resolved.pixel(SIZE / 2, SIZE / 2);
    assert_abs_diff_eq!(centre.distance(Vec4::ONE), 0.0, epsilon = 1e-3);
    for (x, y) in [(0, 0), (SIZE - 1, 0), (0, SIZE - 1), (SIZE - 1, SIZE - 1)] {
        assert_eq!(resolved.pixel(x, y), Vec4::ZERO);
    }
}

#[test]
fn draw_order_does_not_change_the_image() {
    let compositor = SoftwareCompositor::new(SIZE, SIZE, 4).unwrap();
    let view = SplatView::looking_at(Vec3::new(1.0, 0.5, 6.0), Vec3::ZERO, Vec3::Y, 0.8, 1.0);

    let red = PointCloudFrame::new().with_instance(
        PointCloudInstance::default(),
        vec![Vec4::new(0.0, 0.0, 0.0, 1.5), Vec4::new(0.3, 0.2, -1.0, 1.0)],
    );
    let blue = PointCloudFrame::new().with_instance(
        PointCloudInstance::new(Affine3A::from_translation(Vec3::new(0.2, -0.1, 0.8))),
        vec![Vec4::new(0.0, 0.0, 0.0, 1.2)],
    );
    let red_material = UniformColor { color: Vec4::new(1.0, 0.1, 0.1, 0.6) };
    let blue_material = UniformColor { color: Vec4::new(0.1, 0.2, 1.0, 0.4) };

    let mut first = compositor.new_target().unwrap();
    compositor.draw(&mut first, &view, &red, &red_material).unwrap();
    compositor.draw(&mut first, &view, &blue, &blue_material).unwrap();

    let mut second = compositor.new_target().unwrap();
    compositor.draw(&mut second, &view, &blue, &blue_material).unwrap();
    compositor.draw(&mut second, &view, &red, &red_material).unwrap();

    let background = Vec4::new(0.05, 0.05, 0.05, 1.0);
    let a = resolve_target(&first).to_image(background);
    let b = resolve_target(&second).to_image(background);
    for (pa, pb) in a.iter().zip(b.iter()) {
        assert_abs_diff_eq!(pa.distance(*pb), 0.0, epsilon = 1e-4);
    }
}

#[test]
fn distance_hue_goes_red_to_green_with_distance() {
    let compositor = SoftwareCompositor::new(SIZE, SIZE, 1).unwrap();
    let params = DistanceHueParams {
        distance_min: 0.0,
        distance_max: 10.0,
        hue_min: 0.0,
        hue_max: std::f32::consts::TAU / 3.0,
    };
    let material = DistanceHue::new(params);

    let near = PointCloudFrame::new().with_instance(
        PointCloudInstance::default(),
        vec![Vec4::new(0.0, 0.0, 5.0 - 0.5, 0.05)],
    );
    let far = PointCloudFrame::new().with_instance(
        PointCloudInstance::default(),
        vec![Vec4::new(0.0, 0.0, -20.0, 1.0)],
    );

    let near_pixel = compositor
        .render(&front_view(), &near, &material)
        .unwrap()
        .sample(SIZE / 2, SIZE / 2, 0);
    let far_pixel = compositor
        .render(&front_view(), &far, &material)
        .unwrap()
        .sample(SIZE / 2, SIZE / 2, 0);

    assert!(near_pixel.x > 0.9 && near_pixel.y < 0.1, "near: {near_pixel:?}");
    assert!(far_pixel.y > 0.9 && far_pixel.x < 0.1, "far: {far_pixel:?}");
    assert_abs_diff_eq!(near_pixel.w, 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(far_pixel.w, 0.5, epsilon = 1e-6);
}

#[test]
fn splat_keeps_its_screen_size_under_instance_rotation() {
    let compositor = SoftwareCompositor::new(SIZE, SIZE, 1).unwrap();
    let point = vec![Vec4::new(0.0, 0.0, 0.0, 1.0)];
    let plain = PointCloudFrame::new().with_instance(PointCloudInstance::default(), point.clone());
    let rotated = PointCloudFrame::new().with_instance(
        PointCloudInstance::new(Affine3A::from_rotation_y(1.1)),
        point,
    );

    let count = |frame: &PointCloudFrame| {
        compositor
            .render(&front_view(), frame, &UniformColor::default())
            .unwrap()
            .to_image(Vec4::ZERO)
            .iter()
            .filter(|c| c.w > 0.5)
            .count()
    };
    assert!(count(&plain) > 0);
    assert_eq!(count(&plain), count(&rotated));
}
