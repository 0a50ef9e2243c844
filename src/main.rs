use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use bowling_lane::prelude::*;

fn main() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let auto = AutoConfig::from_args(std::env::args().skip(1));
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.10, 0.10, 0.14)))
        .insert_resource(Msaa::Sample4)
        .insert_resource(AmbientLight {
            color: Color::srgb(0.55, 0.55, 0.60),
            brightness: 800.0,
        })
        .insert_resource(auto)
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window { title: "Bowling Lane".into(), ..default() }),
            ..default()
        }))
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
        .add_plugins(CoreSimPlugin)      // timing, turn pipeline order, run config
        .add_plugins(PinTrackerPlugin)   // pin falls for the current throw
        .add_plugins(ArbiterPlugin)      // one resolution per throw
        .add_plugins(GameStatePlugin)    // frames, rolls, scores
        .add_plugins(LevelPlugin)        // lane file, world & entities
        .add_plugins(BallPlugin)
        .add_plugins(PinsPlugin)
        .add_plugins(ThrowingPlugin)     // input + power bar
        .add_plugins(AutoplayPlugin)     // scripted throws with --autoplay
        .add_plugins(HudPlugin)          // scoresheet
        .run();
}
